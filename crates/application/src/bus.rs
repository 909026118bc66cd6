//! Routing of commands and queries onto the portfolio service.

use std::sync::Arc;

use domain::PortfolioService;

use crate::command::{Command, CommandOutcome, RawCommand};
use crate::error::{ApplicationError, Result};
use crate::query::{PortfolioHistoryView, PortfolioView, Query, QueryResponse, RawQuery};

/// Executes commands.
///
/// A failed command emits nothing; a successful one emits exactly one event.
#[derive(Clone)]
pub struct CommandBus {
    service: Arc<PortfolioService>,
}

impl CommandBus {
    pub fn new(service: Arc<PortfolioService>) -> Self {
        Self { service }
    }

    /// Parses and executes an envelope.
    ///
    /// An envelope naming no known command is logged and otherwise ignored.
    #[tracing::instrument(skip(self, raw), fields(command = %raw.name))]
    pub async fn dispatch(&self, raw: RawCommand) -> Result<()> {
        match Command::try_from(raw) {
            Ok(command) => self.execute(command).await.map(|_| ()),
            Err(ApplicationError::Routing(e)) => {
                tracing::error!(error = %e, "command not routed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self, command), fields(command = command.name()))]
    pub async fn execute(&self, command: Command) -> Result<CommandOutcome> {
        metrics::counter!("commands_dispatched", "command" => command.name()).increment(1);

        let outcome = match command {
            Command::CreatePortfolio { name } => {
                CommandOutcome::PortfolioCreated(self.service.create_portfolio(name).await?)
            }
            Command::CreateAsset { portfolio_id, name } => {
                CommandOutcome::AssetCreated(self.service.create_asset(portfolio_id, name).await?)
            }
            Command::CreateBuilding {
                portfolio_id,
                asset_name,
                addresses,
            } => CommandOutcome::BuildingCreated(
                self.service
                    .create_building(portfolio_id, asset_name, addresses)
                    .await?,
            ),
            Command::RollbackPortfolio {
                portfolio_id,
                timestamp,
            } => {
                self.service
                    .rollback_portfolio(portfolio_id, timestamp)
                    .await?;
                CommandOutcome::PortfolioRollbacked
            }
        };
        Ok(outcome)
    }
}

/// Answers queries from the read model; history comes from the store.
#[derive(Clone)]
pub struct QueryProcessor {
    service: Arc<PortfolioService>,
}

impl QueryProcessor {
    pub fn new(service: Arc<PortfolioService>) -> Self {
        Self { service }
    }

    /// Parses and answers an envelope.
    #[tracing::instrument(skip(self, raw), fields(query = %raw.name))]
    pub async fn process(&self, raw: RawQuery) -> Result<QueryResponse> {
        let query = Query::try_from(raw).inspect_err(|e| {
            if let ApplicationError::Routing(e) = e {
                tracing::error!(error = %e, "query not routed");
            }
        })?;
        self.execute(query).await
    }

    #[tracing::instrument(skip(self, query), fields(query = query.name()))]
    pub async fn execute(&self, query: Query) -> Result<QueryResponse> {
        metrics::counter!("queries_processed", "query" => query.name()).increment(1);

        let response = match query {
            Query::GetPortfolio { portfolio_id } => {
                let portfolio = self.service.get_portfolio(portfolio_id).await?;
                QueryResponse::Portfolio(portfolio.as_ref().into())
            }
            Query::GetAllPortfolios => QueryResponse::Portfolios(
                self.service
                    .get_all_portfolios()
                    .await
                    .iter()
                    .map(|p| PortfolioView::from(p.as_ref()))
                    .collect(),
            ),
            Query::GetPortfolioHistory { portfolio_id } => {
                let events = self.service.get_portfolio_history(portfolio_id).await?;
                QueryResponse::History(PortfolioHistoryView::new(portfolio_id, events))
            }
        };
        Ok(response)
    }
}
