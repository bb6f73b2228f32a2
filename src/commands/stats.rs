use crate::api::{Backend, Transaction};
use crate::args::{BookArgs, StatsArgs};
use crate::commands::Out;
use crate::model::{Amount, BommelStatistics, OrganizationStatistics};
use crate::{Config, Result};
use anyhow::Context;
use rust_decimal::Decimal;
use serde::Serialize;

/// The figures `stats` printed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum StatsReport {
    Organization(OrganizationStatistics),
    Bommel(BommelStatistics),
}

/// Fetches statistics from the backend, for the whole organization or for `args.bommel()`.
/// `--aggregate` only applies to a single Bommel.
pub async fn stats(
    config: Config,
    backend: &mut (dyn Backend + Send),
    args: StatsArgs,
) -> Result<Out<StatsReport>> {
    let include_drafts = args.statistics().include_drafts() || config.include_drafts();
    let currency = config.currency();
    match args.bommel() {
        Some(id) => {
            let aggregate = args.statistics().aggregate();
            let s = backend
                .bommel_statistics(id, include_drafts, aggregate)
                .await
                .with_context(|| format!("Unable to fetch the statistics of Bommel {id}"))?;
            let title = format!(
                "Bommel {id}{}",
                if aggregate { " and everything beneath it" } else { "" }
            );
            let message = figures(
                &title,
                currency,
                s.income,
                s.expenses,
                s.total,
                s.transactions_count,
            );
            Ok(Out::new(message, StatsReport::Bommel(s)))
        }
        None => {
            let s = backend
                .organization_statistics(config.organization_id(), include_drafts)
                .await
                .context("Unable to fetch the organization statistics")?;
            let title = format!("{} ({} Bommels)", config.organization_name(), s.total_bommels);
            let message = figures(
                &title,
                currency,
                s.income,
                s.expenses,
                s.total,
                s.transactions_count,
            );
            Ok(Out::new(message, StatsReport::Organization(s)))
        }
    }
}

/// Books `args.amount()` on `args.bommel()`.
pub async fn book(
    config: Config,
    backend: &mut (dyn Backend + Send),
    args: BookArgs,
) -> Result<Out<Transaction>> {
    let transaction = Transaction {
        bommel_id: args.bommel(),
        amount: args.amount(),
        draft: args.draft(),
    };
    backend
        .book_transaction(transaction.clone())
        .await
        .with_context(|| format!("Unable to book on Bommel {}", args.bommel()))?;
    let message = format!(
        "Booked {} on Bommel {}{}",
        Amount::new(args.amount(), config.currency()),
        args.bommel(),
        if args.draft() { " as a draft" } else { "" }
    );
    Ok(Out::new(message, transaction))
}

fn figures(
    title: &str,
    currency: &str,
    income: Decimal,
    expenses: Decimal,
    total: Decimal,
    transactions_count: u64,
) -> String {
    [
        title.to_string(),
        format!("  Income:       {}", Amount::new(income, currency)),
        format!("  Expenses:     {}", Amount::new(expenses, currency)),
        format!("  Total:        {}", Amount::new(total, currency)),
        format!("  Transactions: {transactions_count}"),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::StatisticsArgs;
    use crate::model::NodeId;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_organization_stats() {
        let env = TestEnv::new().await;
        let mut backend = env.backend();
        let out = stats(env.config(), backend.as_mut(), StatsArgs::default())
            .await
            .unwrap();
        assert!(out.message().starts_with("Test Organization (4 Bommels)"));
        assert!(out.message().contains("Income:       1,500.00 €"));
        assert!(out.message().contains("Expenses:     -530.50 €"));
        assert!(out.message().contains("Total:        969.50 €"));
        assert!(matches!(
            out.structure(),
            Some(StatsReport::Organization(s)) if s.transactions_count == 4
        ));
    }

    #[tokio::test]
    async fn test_bommel_stats_aggregated_with_drafts() {
        let env = TestEnv::new().await;
        let mut backend = env.backend();
        let args = StatsArgs::new(Some(NodeId::new(1)), StatisticsArgs::new(true, true));
        let out = stats(env.config(), backend.as_mut(), args).await.unwrap();
        assert!(out.message().contains("and everything beneath it"));
        assert!(out.message().contains("Total:        849.50 €"));
    }

    #[tokio::test]
    async fn test_book_changes_stats() {
        let env = TestEnv::new().await;
        let mut backend = env.backend();
        let args = BookArgs::new(NodeId::new(2), Decimal::new(-1999, 2), false);
        let out = book(env.config(), backend.as_mut(), args).await.unwrap();
        assert_eq!(out.message(), "Booked -19.99 € on Bommel 2");

        let args = StatsArgs::new(Some(NodeId::new(2)), StatisticsArgs::default());
        let out = stats(env.config(), backend.as_mut(), args).await.unwrap();
        assert!(out.message().contains("Total:        -99.99 €"));
    }

    #[tokio::test]
    async fn test_book_on_unknown_bommel() {
        let env = TestEnv::new().await;
        let mut backend = env.backend();
        let args = BookArgs::new(NodeId::new(42), Decimal::ONE, true);
        assert!(book(env.config(), backend.as_mut(), args).await.is_err());
    }
}
