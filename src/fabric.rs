//! Deployment fabrics: fixed reference data.
//!
//! A fabric is one of six deployment targets, a site/network-type
//! combination. The set is loaded at startup and never mutated.

use serde::{Deserialize, Serialize};

/// Data-center site hosting a fabric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Site {
    North,
    South,
    Tertiary,
}

/// Network type of a fabric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum FabricKind {
    It,
    Ot,
}

impl std::fmt::Display for FabricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FabricKind::It => write!(f, "IT"),
            FabricKind::Ot => write!(f, "OT"),
        }
    }
}

/// One deployment target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fabric {
    pub id: String,
    pub name: String,
    pub site: Site,
    #[serde(rename = "type")]
    pub kind: FabricKind,
    pub description: String,
}

/// The fixed set of six fabrics.
pub fn builtin_fabrics() -> Vec<Fabric> {
    fn fabric(id: &str, name: &str, site: Site, kind: FabricKind, description: &str) -> Fabric {
        Fabric {
            id: id.to_string(),
            name: name.to_string(),
            site,
            kind,
            description: description.to_string(),
        }
    }

    vec![
        fabric(
            "north-it",
            "North IT Fabric",
            Site::North,
            FabricKind::It,
            "IT infrastructure fabric at North data center",
        ),
        fabric(
            "north-ot",
            "North OT Fabric",
            Site::North,
            FabricKind::Ot,
            "Operational Technology fabric at North data center",
        ),
        fabric(
            "south-it",
            "South IT Fabric",
            Site::South,
            FabricKind::It,
            "IT infrastructure fabric at South data center",
        ),
        fabric(
            "south-ot",
            "South OT Fabric",
            Site::South,
            FabricKind::Ot,
            "Operational Technology fabric at South data center",
        ),
        fabric(
            "tertiary-it",
            "Tertiary IT Fabric",
            Site::Tertiary,
            FabricKind::It,
            "IT infrastructure fabric at Tertiary data center (NDO host)",
        ),
        fabric(
            "tertiary-ot",
            "Tertiary OT Fabric",
            Site::Tertiary,
            FabricKind::Ot,
            "Operational Technology fabric at Tertiary data center (NDO managed)",
        ),
    ]
}

/// Look up a fabric by id.
pub fn find_fabric<'a>(fabrics: &'a [Fabric], fabric_id: &str) -> Option<&'a Fabric> {
    fabrics.iter().find(|fabric| fabric.id == fabric_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_has_six_unique_ids() {
        let fabrics = builtin_fabrics();
        assert_eq!(fabrics.len(), 6);
        let mut ids: Vec<_> = fabrics.iter().map(|f| f.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn tertiary_fabrics_are_at_tertiary_site() {
        let fabrics = builtin_fabrics();
        for id in ["tertiary-it", "tertiary-ot"] {
            assert_eq!(find_fabric(&fabrics, id).unwrap().site, Site::Tertiary);
        }
        assert_eq!(find_fabric(&fabrics, "north-it").unwrap().site, Site::North);
    }

    #[test]
    fn fabric_serializes_type_field() {
        let fabrics = builtin_fabrics();
        let json = serde_json::to_value(&fabrics[0]).unwrap();
        assert_eq!(json["type"], "IT");
        assert_eq!(json["site"], "North");
    }
}
