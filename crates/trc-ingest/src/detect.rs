use std::fmt;
use std::path::Path;

use crate::columns::HeaderIndex;
use crate::csv_source::read_header_index;
use crate::IngestError;

/// What a tabular input file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    ClientOrders,
    BrokerTrades,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::ClientOrders => "orders",
            FileKind::BrokerTrades => "trades",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a file by name first, then by header.
///
/// - name contains `client` or `order` → client orders
/// - name contains `broker` or `trade` → broker trades
/// - header has both `buy/sell flag` and `qty` → broker trades
/// - otherwise broker trades
pub fn identify_file_kind(file_name: &str, headers: &HeaderIndex) -> FileKind {
    let name = file_name.to_ascii_lowercase();

    if name.contains("client") || name.contains("order") {
        return FileKind::ClientOrders;
    }
    if name.contains("broker") || name.contains("trade") {
        return FileKind::BrokerTrades;
    }
    if headers.contains("buy/sell flag") && headers.contains("qty") {
        return FileKind::BrokerTrades;
    }
    FileKind::BrokerTrades
}

/// Read only the header row of `path` and classify it.
pub fn sniff_file(path: &Path) -> Result<FileKind, IngestError> {
    let headers = read_header_index(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = identify_file_kind(&name, &headers);
    tracing::debug!(file = %path.display(), %kind, "file kind identified");
    Ok(kind)
}
