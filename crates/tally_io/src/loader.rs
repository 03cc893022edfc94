//! Loader: read a local scenario JSON (params → political businesses →
//! events), check cross references, and return a typed `Scenario` for the
//! pipeline. No network I/O.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tally_core::entities::{CountingCircleResultSnapshot, PoliticalBusinessConfig};
use tally_core::events::EndResultEvent;
use tally_core::ids::PoliticalBusinessId;
use tally_core::variables::{EngineParams, ProportionalElectionMandateAlgorithm};

use crate::{hasher, IoError, IoResult};

const MAX_SCENARIO_BYTES: u64 = 16 * 1024 * 1024;

/// One replayable input: configuration plus the ordered event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub params: EngineParams,
    pub political_businesses: Vec<PoliticalBusinessConfig>,
    #[serde(default)]
    pub events: Vec<EndResultEvent>,
}

impl Scenario {
    /// SHA-256 of the canonical scenario bytes.
    pub fn digest(&self) -> IoResult<String> {
        hasher::sha256_canonical(self)
    }
}

/// Read, parse and check a scenario file.
pub fn load_scenario(path: &Path) -> IoResult<Scenario> {
    let v = read_json_value_with_limits(path)?;
    let scenario = scenario_from_value(v)?;
    check_cross_refs(&scenario)?;
    Ok(scenario)
}

/// Parse and check a scenario from an in-memory JSON string.
pub fn parse_scenario(json: &str) -> IoResult<Scenario> {
    let v: Value = serde_json::from_str(json)?;
    let scenario = scenario_from_value(v)?;
    check_cross_refs(&scenario)?;
    Ok(scenario)
}

fn read_json_value_with_limits(path: &Path) -> IoResult<Value> {
    let f = File::open(path).map_err(|e| IoError::Path(format!("open {}: {e}", path.display())))?;
    let mut buf = Vec::new();
    f.take(MAX_SCENARIO_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|e| IoError::Path(format!("read {}: {e}", path.display())))?;
    if buf.len() as u64 > MAX_SCENARIO_BYTES {
        return Err(IoError::Invalid(format!(
            "{} exceeds {MAX_SCENARIO_BYTES} bytes",
            path.display()
        )));
    }
    Ok(serde_json::from_slice(&buf)?)
}

fn scenario_from_value(v: Value) -> IoResult<Scenario> {
    // Parse sections separately so errors carry a pointer to the section.
    let Value::Object(mut map) = v else {
        return Err(IoError::Json { pointer: "/".into(), msg: "expected an object".into() });
    };
    if let Some(unknown) = map
        .keys()
        .find(|k| !matches!(k.as_str(), "params" | "political_businesses" | "events"))
    {
        return Err(IoError::Json {
            pointer: format!("/{unknown}"),
            msg: "unknown field".into(),
        });
    }

    let params = match map.remove("params") {
        Some(p) => section(p, "/params")?,
        None => EngineParams::default(),
    };
    let political_businesses = match map.remove("political_businesses") {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| section(item, &format!("/political_businesses/{i}")))
            .collect::<IoResult<Vec<_>>>()?,
        _ => {
            return Err(IoError::Json {
                pointer: "/political_businesses".into(),
                msg: "expected an array".into(),
            })
        }
    };
    let events = match map.remove("events") {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| section(item, &format!("/events/{i}")))
            .collect::<IoResult<Vec<_>>>()?,
        Some(_) => {
            return Err(IoError::Json { pointer: "/events".into(), msg: "expected an array".into() })
        }
        None => Vec::new(),
    };

    Ok(Scenario { params, political_businesses, events })
}

fn section<T: for<'de> Deserialize<'de>>(v: Value, pointer: &str) -> IoResult<T> {
    serde_json::from_value(v).map_err(|e| IoError::Json { pointer: pointer.to_string(), msg: e.to_string() })
}

/// Cross references inside one scenario (early failures, before any event runs).
pub fn check_cross_refs(s: &Scenario) -> IoResult<()> {
    let mut kinds: BTreeMap<&PoliticalBusinessId, &PoliticalBusinessConfig> = BTreeMap::new();
    for pb in &s.political_businesses {
        if kinds.insert(pb.id(), pb).is_some() {
            return Err(IoError::Invalid(format!("duplicate political business {}", pb.id())));
        }
    }

    for pb in &s.political_businesses {
        match pb {
            PoliticalBusinessConfig::Vote(v) => unique(v.ballots.iter(), "ballot", &v.id)?,
            PoliticalBusinessConfig::MajorityElection(me) => {
                unique(me.candidates.iter(), "candidate", &me.id)?
            }
            PoliticalBusinessConfig::ProportionalElection(pe) => {
                unique(pe.lists.iter().map(|l| &l.id), "list", &pe.id)?;
                unique(pe.lists.iter().flat_map(|l| l.candidates.iter()), "candidate", &pe.id)?;
                for l in &pe.lists {
                    if l.sub_list_union.is_some() && l.list_union.is_none() {
                        return Err(IoError::Invalid(format!(
                            "list {} of {} has a sub-list union without a list union",
                            l.id, pe.id
                        )));
                    }
                }
            }
            PoliticalBusinessConfig::ProportionalElectionUnion(u) => {
                unique(u.election_ids.iter(), "member election", &u.id)?;
                for id in &u.election_ids {
                    match kinds.get(id) {
                        Some(PoliticalBusinessConfig::ProportionalElection(pe))
                            if pe.mandate_algorithm
                                == ProportionalElectionMandateAlgorithm::DoubleProportionalUnion => {}
                        Some(_) => {
                            return Err(IoError::Invalid(format!(
                                "union {} member {id} is not a union double proportional election",
                                u.id
                            )))
                        }
                        None => {
                            return Err(IoError::Invalid(format!(
                                "union {} references unknown election {id}",
                                u.id
                            )))
                        }
                    }
                }
            }
        }
    }

    for (i, ev) in s.events.iter().enumerate() {
        let id = ev.political_business_id();
        let Some(pb) = kinds.get(id) else {
            return Err(IoError::Invalid(format!(
                "event {i} ({}) references unknown political business {id}",
                ev.name()
            )));
        };
        if let EndResultEvent::CountingCircleResultApplied { result, .. } = ev {
            let matches = matches!(
                (pb, result),
                (PoliticalBusinessConfig::Vote(_), CountingCircleResultSnapshot::Vote(_))
                    | (
                        PoliticalBusinessConfig::MajorityElection(_),
                        CountingCircleResultSnapshot::MajorityElection(_)
                    )
                    | (
                        PoliticalBusinessConfig::ProportionalElection(_),
                        CountingCircleResultSnapshot::ProportionalElection(_)
                    )
            );
            if !matches {
                return Err(IoError::Invalid(format!(
                    "event {i}: result kind does not match political business {id}"
                )));
            }
        }
    }
    Ok(())
}

fn unique<'a, T: Ord + std::fmt::Display + 'a>(
    items: impl Iterator<Item = &'a T>,
    what: &str,
    owner: &PoliticalBusinessId,
) -> IoResult<()> {
    let mut seen = BTreeSet::new();
    for it in items {
        if !seen.insert(it) {
            return Err(IoError::Invalid(format!("duplicate {what} {it} in {owner}")));
        }
    }
    Ok(())
}
