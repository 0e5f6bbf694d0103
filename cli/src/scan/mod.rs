use anyhow::Result;
use scanrelay_core::{
    Config, FileJobStore, JobStore, MemoryJobStore, Scanner, ScannerClient, StoreKind,
};

pub type CliScanner = Scanner<ScannerClient, Box<dyn JobStore>>;

pub fn build_scanner(config: &Config) -> Result<CliScanner> {
    let client = config.scanner_client()?;

    let store: Box<dyn JobStore> = match config.store.kind {
        StoreKind::Memory => Box::new(MemoryJobStore::new()),
        StoreKind::File => Box::new(FileJobStore::new(config.store.dir.clone())),
    };

    Ok(Scanner::new(client, store).with_policy(config.backoff_policy()))
}
