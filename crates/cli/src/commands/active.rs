use anyhow::Result;
use tablecall_core::TableNumber;
use tablecall_storage::CallStore;

pub(crate) async fn run(table: Option<String>) -> Result<()> {
    let transports = super::connect().await?;
    let calls = match table {
        Some(raw) => transports.store.active_calls_for_table(&TableNumber::parse(&raw)?).await?,
        None => transports.store.active_calls().await?,
    };
    println!("{}", serde_json::to_string_pretty(&calls)?);
    Ok(())
}
