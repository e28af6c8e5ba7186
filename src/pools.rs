use crate::model::EntityRecord;

pub struct PoolEntry {
    pub name: &'static str,
    pub query: &'static str,
    pub category: Option<&'static str>,
}

impl PoolEntry {
    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            name: self.name.to_string(),
            query: self.query.to_string(),
            category: self.category.map(ToOwned::to_owned),
        }
    }
}

pub const CORE_ENTITIES: &[PoolEntry] = &[
    PoolEntry {
        name: "Apple Inc.",
        query: "Apple",
        category: None,
    },
    PoolEntry {
        name: "Microsoft Corp.",
        query: "Microsoft",
        category: None,
    },
    PoolEntry {
        name: "London",
        query: "London",
        category: None,
    },
    PoolEntry {
        name: "Albert Einstein",
        query: "Einstein",
        category: None,
    },
    PoolEntry {
        name: "The Godfather",
        query: "Godfather",
        category: None,
    },
];

pub const EXPERT_ENTITIES: &[PoolEntry] = &[
    PoolEntry {
        name: "Myocardial Infarction",
        query: "heart attack",
        category: Some("medical_condition"),
    },
    PoolEntry {
        name: "Neural Network",
        query: "backpropagation algorithm",
        category: Some("AI"),
    },
    PoolEntry {
        name: "Quantum Entanglement",
        query: "quantum entanglement",
        category: Some("physics"),
    },
    PoolEntry {
        name: "Sarbanes-Oxley Act",
        query: "SOX Act",
        category: Some("legal"),
    },
    PoolEntry {
        name: "Gross Domestic Product",
        query: "GDP",
        category: Some("economics"),
    },
];

pub const SPECIAL_CASES: &[PoolEntry] = &[
    PoolEntry {
        name: "The Flash (DC Comics)",
        query: "Flash",
        category: None,
    },
    PoolEntry {
        name: "Taylor Swift",
        query: "Taylor Swift",
        category: None,
    },
    PoolEntry {
        name: "Tyler Swift",
        query: "Tyler Swift",
        category: None,
    },
    PoolEntry {
        name: "The Lord of the Rings: The Fellowship of the Ring",
        query: "Fellowship of the Ring",
        category: None,
    },
    PoolEntry {
        name: "N.W.A.",
        query: "NWA",
        category: None,
    },
];

/// Each pool carries equal selection weight regardless of its cardinality;
/// callers draw the pool first, then a record within it.
pub fn pool_set() -> [&'static [PoolEntry]; 3] {
    [CORE_ENTITIES, EXPERT_ENTITIES, SPECIAL_CASES]
}

#[cfg(test)]
mod tests {
    use super::{pool_set, EXPERT_ENTITIES};

    #[test]
    fn pool_set_has_three_nonempty_pools() {
        let pools = pool_set();
        assert_eq!(pools.len(), 3);
        for pool in pools {
            assert!(!pool.is_empty());
        }
    }

    #[test]
    fn to_record_copies_the_entry() {
        let record = EXPERT_ENTITIES[0].to_record();
        assert_eq!(record.name, "Myocardial Infarction");
        assert_eq!(record.query, "heart attack");
        assert_eq!(record.category.as_deref(), Some("medical_condition"));
    }
}
