//! Infrastructure and workload descriptions stored as JSON arrays.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use riskplace_core::ledger::{NodeRecord, Tier};
use riskplace_core::request::{Request, RequestRecord};
use riskplace_core::{GroupId, RequestId, duration_from_hours, hours};

/// One pod of the workload file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PodRecord {
    pub id: RequestId,
    #[serde(rename = "type")]
    pub tier: Tier,
    pub cores: u32,
    pub memory: u64,
    /// Highest node risk the pod accepts.
    pub risk: f64,
    #[serde(default)]
    pub region: u32,
    pub lease_hours: f64,
    pub arrival_hours: f64,
    pub group: GroupId,
}

impl PodRecord {
    fn validate(&self) -> crate::Result<()> {
        let finite_non_negative = |v: f64| v.is_finite() && v >= 0.0;
        if !finite_non_negative(self.risk)
            || !finite_non_negative(self.lease_hours)
            || !finite_non_negative(self.arrival_hours)
        {
            return Err(crate::Error::InvalidInput(format!(
                "pod {} has a negative or non-finite risk, lease or arrival",
                self.id
            )));
        }
        Ok(())
    }
}

impl From<PodRecord> for RequestRecord {
    fn from(pod: PodRecord) -> Self {
        RequestRecord {
            id: pod.id,
            tier: pod.tier,
            cores: pod.cores,
            memory: pod.memory,
            risk_ceiling: pod.risk,
            region: pod.region,
            lease: duration_from_hours(pod.lease_hours),
            arrival: duration_from_hours(pod.arrival_hours),
            group: pod.group,
        }
    }
}

impl From<&Request> for PodRecord {
    fn from(request: &Request) -> Self {
        PodRecord {
            id: request.id(),
            tier: request.tier(),
            cores: request.cpu(),
            memory: request.memory(),
            risk: request.risk_ceiling(),
            region: request.region(),
            lease_hours: hours(request.lease()),
            arrival_hours: hours(request.arrival()),
            group: request.group(),
        }
    }
}

fn validate_node(idx: usize, node: &NodeRecord) -> crate::Result<()> {
    let finite_non_negative = |v: f64| v.is_finite() && v >= 0.0;
    if !finite_non_negative(node.risk)
        || !finite_non_negative(node.price)
        || !finite_non_negative(node.power)
    {
        return Err(crate::Error::InvalidInput(format!(
            "node {idx} has a negative or non-finite risk, price or power"
        )));
    }
    if node.region == 0 {
        return Err(crate::Error::InvalidInput(format!(
            "node {idx} has region 0; node regions start at 1"
        )));
    }
    Ok(())
}

pub fn parse_infrastructure(text: &str) -> crate::Result<Vec<NodeRecord>> {
    let nodes: Vec<NodeRecord> = serde_json::from_str(text)?;
    for (idx, node) in nodes.iter().enumerate() {
        validate_node(idx, node)?;
    }
    Ok(nodes)
}

pub fn load_infrastructure(path: &Path) -> crate::Result<Vec<NodeRecord>> {
    let nodes: Vec<NodeRecord> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    for (idx, node) in nodes.iter().enumerate() {
        validate_node(idx, node)?;
    }
    log::info!("Loaded {} node(s) from {}", nodes.len(), path.display());
    Ok(nodes)
}

pub fn parse_workload(text: &str) -> crate::Result<Vec<Request>> {
    let pods: Vec<PodRecord> = serde_json::from_str(text)?;
    into_requests(pods)
}

pub fn load_workload(path: &Path) -> crate::Result<Vec<Request>> {
    let pods: Vec<PodRecord> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let requests = into_requests(pods)?;
    log::info!("Loaded {} pod(s) from {}", requests.len(), path.display());
    Ok(requests)
}

fn into_requests(pods: Vec<PodRecord>) -> crate::Result<Vec<Request>> {
    let mut seen = riskplace_core::Set::default();
    pods.into_iter()
        .map(|pod| {
            pod.validate()?;
            if !seen.insert(pod.id) {
                return Err(crate::Error::InvalidInput(format!(
                    "pod id {} appears more than once",
                    pod.id
                )));
            }
            Ok(Request::from(RequestRecord::from(pod)))
        })
        .collect()
}

pub fn write_infrastructure(out: impl Write, nodes: &[NodeRecord]) -> crate::Result<()> {
    let mut out = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut out, nodes)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

pub fn write_workload(out: impl Write, requests: &[Request]) -> crate::Result<()> {
    let pods: Vec<PodRecord> = requests.iter().map(PodRecord::from).collect();
    let mut out = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut out, &pods)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
