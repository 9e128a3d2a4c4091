use boxscan_core::batch::DocumentExtraction;
use boxscan_core::error::BoxscanError;

pub fn print(documents: &[DocumentExtraction]) -> Result<(), BoxscanError> {
    let json = serde_json::to_string_pretty(documents)?;
    println!("{json}");
    Ok(())
}
