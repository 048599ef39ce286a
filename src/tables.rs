use std::collections::HashMap;

use thiserror::Error;

/// A foreign-key column on a table.
///
/// Inside the store the column holds a local rowid of the referenced table;
/// inside any serialized stream it holds that row's external uuid. The
/// exporter and importer translate between the two representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FkColumn {
    pub column: &'static str,
    pub references: &'static str,
}

/// Static description of one table of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: &'static str,
    /// FK columns subject to uuid <-> rowid translation.
    pub foreign_keys: &'static [FkColumn],
    /// Tables referenced through portable natural keys (currency ISO codes).
    /// They constrain processing order but need no identifier translation.
    pub natural_deps: &'static [&'static str],
}

impl TableDescriptor {
    /// Tables that must be processed before this one. Self-references
    /// (categories.parent) are resolved inside the table and excluded here.
    pub fn depends_on(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.foreign_keys
            .iter()
            .map(|fk| fk.references)
            .chain(self.natural_deps.iter().copied())
            .filter(move |dep| *dep != self.name)
    }

    pub fn fk_for_column(&self, column: &str) -> Option<&FkColumn> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    pub fn has_self_reference(&self) -> bool {
        self.foreign_keys.iter().any(|fk| fk.references == self.name)
    }
}

const fn fk(column: &'static str, references: &'static str) -> FkColumn {
    FkColumn { column, references }
}

/// Every table of the dataset, in canonical processing order.
///
/// Declaration order is the topological order of the foreign-key graph;
/// `topological_order` re-derives it from the dependency metadata and the
/// two must agree (enforced by test and revalidated at first use).
pub static REGISTRY: &[TableDescriptor] = &[
    TableDescriptor {
        name: "currencies",
        foreign_keys: &[],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "wallets",
        foreign_keys: &[],
        natural_deps: &["currencies"],
    },
    TableDescriptor {
        name: "categories",
        foreign_keys: &[fk("parent", "categories")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "events",
        foreign_keys: &[],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "places",
        foreign_keys: &[],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "people",
        foreign_keys: &[],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "event_people",
        foreign_keys: &[fk("event", "events"), fk("person", "people")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "debts",
        foreign_keys: &[fk("wallet", "wallets"), fk("place", "places")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "debt_people",
        foreign_keys: &[fk("debt", "debts"), fk("person", "people")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "budgets",
        foreign_keys: &[fk("category", "categories")],
        natural_deps: &["currencies"],
    },
    TableDescriptor {
        name: "budget_wallets",
        foreign_keys: &[fk("budget", "budgets"), fk("wallet", "wallets")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "savings",
        foreign_keys: &[fk("wallet", "wallets")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "recurrent_transactions",
        foreign_keys: &[
            fk("category", "categories"),
            fk("wallet", "wallets"),
            fk("place", "places"),
            fk("event", "events"),
        ],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "recurrent_transfers",
        foreign_keys: &[
            fk("wallet_from", "wallets"),
            fk("wallet_to", "wallets"),
            fk("place", "places"),
            fk("event", "events"),
        ],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transactions",
        foreign_keys: &[
            fk("category", "categories"),
            fk("wallet", "wallets"),
            fk("place", "places"),
            fk("event", "events"),
            fk("saving", "savings"),
            fk("debt", "debts"),
            fk("recurrence", "recurrent_transactions"),
        ],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transaction_people",
        foreign_keys: &[fk("transaction", "transactions"), fk("person", "people")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transaction_models",
        foreign_keys: &[
            fk("category", "categories"),
            fk("wallet", "wallets"),
            fk("place", "places"),
            fk("event", "events"),
        ],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transfers",
        foreign_keys: &[
            fk("transaction_from", "transactions"),
            fk("transaction_to", "transactions"),
            fk("transaction_tax", "transactions"),
            fk("place", "places"),
            fk("event", "events"),
            fk("recurrence", "recurrent_transfers"),
        ],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transfer_people",
        foreign_keys: &[fk("transfer", "transfers"), fk("person", "people")],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transfer_models",
        foreign_keys: &[
            fk("wallet_from", "wallets"),
            fk("wallet_to", "wallets"),
            fk("place", "places"),
            fk("event", "events"),
        ],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "attachments",
        foreign_keys: &[],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transaction_attachments",
        foreign_keys: &[
            fk("transaction", "transactions"),
            fk("attachment", "attachments"),
        ],
        natural_deps: &[],
    },
    TableDescriptor {
        name: "transfer_attachments",
        foreign_keys: &[fk("transfer", "transfers"), fk("attachment", "attachments")],
        natural_deps: &[],
    },
];

#[derive(Debug, Error)]
pub enum TableOrderError {
    #[error("dependency cycle involving table {0}")]
    Cycle(String),
    #[error("table {table} depends on unknown table {dependency}")]
    UnknownDependency { table: String, dependency: String },
}

pub fn descriptor(name: &str) -> Option<&'static TableDescriptor> {
    REGISTRY.iter().find(|d| d.name == name)
}

/// Derive the processing order with a stable Kahn sort over the registry.
///
/// Ties break by declaration index, so a valid registry sorts to itself.
pub fn topological_order() -> Result<Vec<&'static TableDescriptor>, TableOrderError> {
    let index: HashMap<&str, usize> = REGISTRY
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name, i))
        .collect();

    let mut in_degree = vec![0usize; REGISTRY.len()];
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); REGISTRY.len()];
    for (i, desc) in REGISTRY.iter().enumerate() {
        for dep in desc.depends_on() {
            let j = *index
                .get(dep)
                .ok_or_else(|| TableOrderError::UnknownDependency {
                    table: desc.name.to_string(),
                    dependency: dep.to_string(),
                })?;
            edges[j].push(i);
            in_degree[i] += 1;
        }
    }

    let mut ready: Vec<usize> = in_degree
        .iter()
        .enumerate()
        .filter_map(|(i, d)| (*d == 0).then_some(i))
        .collect();
    let mut out = Vec::with_capacity(REGISTRY.len());

    while !ready.is_empty() {
        ready.sort_unstable();
        let next = ready.remove(0);
        out.push(&REGISTRY[next]);
        for &succ in &edges[next] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                ready.push(succ);
            }
        }
    }

    if out.len() != REGISTRY.len() {
        let stuck = REGISTRY
            .iter()
            .enumerate()
            .find(|(i, _)| in_degree[*i] > 0)
            .map(|(_, d)| d.name.to_string())
            .unwrap_or_default();
        return Err(TableOrderError::Cycle(stuck));
    }

    Ok(out)
}
