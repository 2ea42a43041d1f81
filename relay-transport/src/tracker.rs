use crate::error::{TransportError, TransportResult};
use relay_wire::NodeAddr;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One sender a tracker row advertises for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerPeer {
    pub id: u32,
    pub addr: NodeAddr,
}

/// The parsed tracker file: for each filename, the senders to consult in
/// ascending id order.
#[derive(Debug, Default)]
pub struct Tracker {
    files: HashMap<String, Vec<TrackerPeer>>,
}

impl Tracker {
    /// Loads a tracker file of whitespace-separated
    /// `filename id host port` rows. Blank lines are skipped.
    pub fn load(path: &Path) -> TransportResult<Self> {
        let text = fs::read_to_string(path)?;
        let mut files: HashMap<String, Vec<TrackerPeer>> = HashMap::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = parse_row(line).map_err(|reason| TransportError::Tracker {
                path: path.display().to_string(),
                line: index + 1,
                reason,
            })?;
            files.entry(row.0).or_default().push(row.1);
        }

        for peers in files.values_mut() {
            peers.sort_by_key(|peer| peer.id);
        }
        Ok(Self { files })
    }

    /// The peers advertising `filename`, ordered by ascending id. Empty when
    /// the tracker does not know the file.
    pub fn peers_for(&self, filename: &str) -> &[TrackerPeer] {
        self.files.get(filename).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn parse_row(line: &str) -> Result<(String, TrackerPeer), String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [filename, id, host, port] = fields.as_slice() else {
        return Err(format!("expected 4 fields, got {}", fields.len()));
    };
    let id: u32 = id.parse().map_err(|_| format!("bad id {id:?}"))?;
    let port: u16 = port.parse().map_err(|_| format!("bad port {port:?}"))?;
    let addr = NodeAddr::resolve(host, port).map_err(|e| e.to_string())?;
    Ok((filename.to_string(), TrackerPeer { id, addr }))
}
