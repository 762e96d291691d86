//! Register and graph catalogs for the EmonDmon meter.
//!
//! Both tables are ordered slices so iteration follows definition order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PollerError;

/// Address of the first of two consecutive holding registers.
pub type RegisterAddress = u16;

/// A named measurement stored as a 32-bit float in two holding registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    /// Stable measurement identifier, e.g. `volt-a2n`.
    pub id: &'static str,
    /// First register of the pair.
    pub address: RegisterAddress,
    /// Unit of measurement (empty for power factor).
    pub unit: &'static str,
}

const fn reg(id: &'static str, address: RegisterAddress, unit: &'static str) -> Register {
    Register { id, address, unit }
}

/// Every measurement the meter exposes, in the order "all" mode reads them.
pub const REGISTERS: &[Register] = &[
    reg("volt-12n", 1020, "V"),
    reg("volt-a2n", 1058, "V"),
    reg("volt-b2n", 1060, "V"),
    reg("volt-c2n", 1062, "V"),
    reg("volt-121", 1022, "V"),
    reg("volt-a2b", 1064, "V"),
    reg("volt-b2c", 1066, "V"),
    reg("volt-c2a", 1068, "V"),
    reg("load-d", 1000, "kW"),
    reg("load-r", 1002, "kW"),
    reg("pf", 1014, ""),
    reg("pf-a", 1046, ""),
    reg("pf-b", 1048, ""),
    reg("pf-c", 1050, ""),
    reg("amp", 1018, "A"),
    reg("amp-a", 1052, "A"),
    reg("amp-b", 1054, "A"),
    reg("amp-c", 1056, "A"),
    reg("freq", 1024, "Hz"),
    reg("pwr-real", 1008, "kW"),
    reg("pwr-reac", 1010, "kVAR"),
    reg("pwr-appa", 1012, "kVA"),
    reg("pwr-real-a", 1028, "kW"),
    reg("pwr-real-b", 1030, "kW"),
    reg("pwr-real-c", 1032, "kW"),
    reg("pwr-reac-a", 1034, "kVAR"),
    reg("pwr-reac-b", 1036, "kVAR"),
    reg("pwr-reac-c", 1038, "kVAR"),
    reg("pwr-appa-a", 1040, "kVA"),
    reg("pwr-appa-b", 1042, "kVA"),
    reg("pwr-appa-c", 1044, "kVA"),
];

/// Find a register by measurement id.
pub fn lookup(id: &str) -> Option<&'static Register> {
    REGISTERS.iter().find(|r| r.id == id)
}

/// Address of a catalog measurement.
///
/// # Panics
///
/// Panics if `id` is not in [`REGISTERS`]. Ids come from the catalogs
/// themselves, so a miss is a bug rather than bad input.
pub fn address_of(id: &str) -> RegisterAddress {
    match lookup(id) {
        Some(register) => register.address,
        None => panic!("measurement id '{}' is not in the register catalog", id),
    }
}

/// All measurement ids in catalog definition order.
pub fn all_ids() -> impl ExactSizeIterator<Item = &'static str> {
    REGISTERS.iter().map(|r| r.id)
}

/// Smallest valid graph number.
pub const GRAPH_MIN: u8 = 1;
/// Largest valid graph number.
pub const GRAPH_MAX: u8 = 10;

/// A validated graph number in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GraphId(u8);

impl GraphId {
    /// Validate a graph number.
    pub fn new(id: u8) -> Result<Self, PollerError> {
        if (GRAPH_MIN..=GRAPH_MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(PollerError::invalid_selection(format!(
                "graph must be between {} and {}, got {}",
                GRAPH_MIN, GRAPH_MAX, id
            )))
        }
    }

    /// The raw graph number.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for GraphId {
    type Error = PollerError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<GraphId> for u8 {
    fn from(id: GraphId) -> Self {
        id.0
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One leg of an instrument panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub id: &'static str,
    pub label: &'static str,
}

/// A logical instrument panel grouping related measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Graph {
    pub id: u8,
    pub title: &'static str,
    pub legs: &'static [Leg],
}

impl Graph {
    /// Measurement ids of this graph in panel order.
    pub fn ids(self) -> impl ExactSizeIterator<Item = &'static str> {
        self.legs.iter().map(|leg| leg.id)
    }
}

const fn leg(id: &'static str, label: &'static str) -> Leg {
    Leg { id, label }
}

/// Instrument panels 1 through 10, in order.
pub const GRAPHS: &[Graph] = &[
    Graph {
        id: 1,
        title: "Voltage Line to N",
        legs: &[
            leg("volt-12n", "Voltage Combined"),
            leg("volt-a2n", "Voltage A-N"),
            leg("volt-b2n", "Voltage B-N"),
            leg("volt-c2n", "Voltage C-N"),
        ],
    },
    Graph {
        id: 2,
        title: "Voltage Line to Line",
        legs: &[
            leg("volt-121", "Voltage Combined"),
            leg("volt-a2b", "Voltage A-B"),
            leg("volt-b2c", "Voltage B-C"),
            leg("volt-c2a", "Voltage C-A"),
        ],
    },
    Graph {
        id: 3,
        title: "KW Load",
        legs: &[
            leg("load-d", "Delivered (Energy in from grid)"),
            leg("load-r", "Received (Energy out to grid)"),
        ],
    },
    Graph {
        id: 4,
        title: "Power Factor",
        legs: &[
            leg("pf", "Combined"),
            leg("pf-a", "Leg A"),
            leg("pf-b", "Leg B"),
            leg("pf-c", "Leg C"),
        ],
    },
    Graph {
        id: 5,
        title: "Amperage",
        legs: &[
            leg("amp", "Combined"),
            leg("amp-a", "Leg A"),
            leg("amp-b", "Leg B"),
            leg("amp-c", "Leg C"),
        ],
    },
    Graph {
        id: 6,
        title: "Frequency",
        legs: &[leg("freq", "Frequency")],
    },
    Graph {
        id: 7,
        title: "Power Combined",
        legs: &[
            leg("pwr-real", "Real Power"),
            leg("pwr-reac", "Reactive Power"),
            leg("pwr-appa", "Apparent Power"),
        ],
    },
    Graph {
        id: 8,
        title: "Real Power by Leg",
        legs: &[
            leg("pwr-real-a", "Leg A"),
            leg("pwr-real-b", "Leg B"),
            leg("pwr-real-c", "Leg C"),
        ],
    },
    Graph {
        id: 9,
        title: "Reactive Power by Leg",
        legs: &[
            leg("pwr-reac-a", "Leg A"),
            leg("pwr-reac-b", "Leg B"),
            leg("pwr-reac-c", "Leg C"),
        ],
    },
    Graph {
        id: 10,
        title: "Apparent Power by Leg",
        legs: &[
            leg("pwr-appa-a", "Leg A"),
            leg("pwr-appa-b", "Leg B"),
            leg("pwr-appa-c", "Leg C"),
        ],
    },
];

/// The panel definition for a graph.
pub fn graph(id: GraphId) -> &'static Graph {
    // GraphId is range-checked, and GRAPHS is indexed 1..=10 in order.
    &GRAPHS[usize::from(id.get() - GRAPH_MIN)]
}

/// Measurement ids of a graph in panel order.
pub fn ids_for(id: GraphId) -> impl ExactSizeIterator<Item = &'static str> {
    graph(id).ids()
}

/// Human-readable listing of every graph, used in CLI help.
pub fn describe_graphs() -> String {
    let mut out = String::new();
    for graph in GRAPHS {
        out.push_str(&format!("{}) {}\n", graph.id, graph.title));
        for leg in graph.legs {
            out.push_str(&format!("        - {}\n", leg.label));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_register_ids_unique() {
        let ids: HashSet<_> = all_ids().collect();
        assert_eq!(ids.len(), REGISTERS.len());
    }

    #[test]
    fn test_register_addresses_unique_and_in_range() {
        let addrs: HashSet<_> = REGISTERS.iter().map(|r| r.address).collect();
        assert_eq!(addrs.len(), REGISTERS.len());
        for register in REGISTERS {
            assert!((1000..=1068).contains(&register.address));
            assert_eq!(register.address % 2, 0, "{} is not word-pair aligned", register.id);
        }
    }

    #[test]
    fn test_address_of_is_stable() {
        for id in all_ids() {
            assert_eq!(address_of(id), address_of(id));
            assert_eq!(address_of(id), lookup(id).unwrap().address);
        }
        assert_eq!(address_of("volt-a2n"), 1058);
        assert_eq!(address_of("pf-a"), 1046);
        assert_eq!(address_of("load-d"), 1000);
    }

    #[test]
    #[should_panic(expected = "not in the register catalog")]
    fn test_address_of_unknown_panics() {
        address_of("volt-x2y");
    }

    #[test]
    fn test_all_ids_definition_order() {
        let ids: Vec<_> = all_ids().collect();
        assert_eq!(ids.len(), 31);
        assert_eq!(&ids[..4], &["volt-12n", "volt-a2n", "volt-b2n", "volt-c2n"]);
        assert_eq!(ids.last(), Some(&"pwr-appa-c"));
    }

    #[test]
    fn test_graph_id_range() {
        assert!(GraphId::new(0).is_err());
        assert!(GraphId::new(11).is_err());
        for n in GRAPH_MIN..=GRAPH_MAX {
            assert_eq!(GraphId::new(n).unwrap().get(), n);
        }
    }

    #[test]
    fn test_graphs_non_empty_and_in_catalog() {
        for n in GRAPH_MIN..=GRAPH_MAX {
            let id = GraphId::new(n).unwrap();
            assert_eq!(graph(id).id, n);
            let ids: Vec<_> = ids_for(id).collect();
            assert!(!ids.is_empty(), "graph {} is empty", n);
            for measurement in ids {
                assert!(lookup(measurement).is_some(), "{} missing", measurement);
            }
        }
    }

    #[test]
    fn test_power_factor_graph() {
        let ids: Vec<_> = ids_for(GraphId::new(4).unwrap()).collect();
        assert_eq!(ids, vec!["pf", "pf-a", "pf-b", "pf-c"]);
    }

    #[test]
    fn test_describe_graphs() {
        let help = describe_graphs();
        assert!(help.starts_with("1) Voltage Line to N\n"));
        assert!(help.contains("6) Frequency\n        - Frequency\n"));
        assert!(help.contains("10) Apparent Power by Leg"));
    }
}
