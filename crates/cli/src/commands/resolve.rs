use anyhow::Result;
use tablecall_core::{CallId, TableNumber};
use tablecall_service::{ResolutionService, parse_target_status};

pub(crate) async fn run(
    id: Option<String>,
    table: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let transports = super::connect().await?;
    let status = parse_target_status(status.as_deref())?;
    let service = ResolutionService::new(transports.store, transports.channel);

    let outcome = match (id, table) {
        (Some(id), _) => service.resolve_one(&CallId::parse(&id)?, status).await?,
        (None, Some(table)) => service.resolve_table(&TableNumber::parse(&table)?, status).await?,
        (None, None) => anyhow::bail!("a call id or --table is required"),
    };
    println!("{}", serde_json::json!({"status": status, "resolved": outcome.resolved()}));
    Ok(())
}
