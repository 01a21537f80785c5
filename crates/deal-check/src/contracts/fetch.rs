//! Collecting contract declarations along the class hierarchy.
//!
//! A method's contract set is its own declarations followed by those of
//! every ancestor that declares a method of the same name, in
//! [`MetadataReader::ancestors`] order (superclass chain nearest-first, then
//! interfaces breadth-first). Merged sets are deduplicated structurally with
//! [`dedup_contracts`], keeping the first (nearest) occurrence.

use deal_core::{dedup_contracts, ClassId, ContractDecl, ContractKind, CoreError, MetadataReader};

/// The contracts one class in the hierarchy declares for a method.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractLevel {
    pub class: ClassId,
    pub contracts: Vec<ContractDecl>,
}

fn declared_contracts(
    reader: &dyn MetadataReader,
    class: ClassId,
    method: &str,
    kind: ContractKind,
) -> Result<Vec<ContractDecl>, CoreError> {
    Ok(reader
        .declared_method(class, method)?
        .map(|m| m.contracts_of(kind).cloned().collect())
        .unwrap_or_default())
}

/// Contracts of `kind` for `method`, grouped by declaring level: `class`
/// itself first, then each ancestor. Levels without declarations are kept
/// (with an empty list) so callers can tell "own" from "inherited".
pub fn fetch_contract_levels(
    reader: &dyn MetadataReader,
    class: ClassId,
    method: &str,
    kind: ContractKind,
) -> Result<Vec<ContractLevel>, CoreError> {
    let mut levels = vec![ContractLevel {
        class,
        contracts: declared_contracts(reader, class, method, kind)?,
    }];
    for ancestor in reader.ancestors(class)? {
        levels.push(ContractLevel {
            class: ancestor,
            contracts: declared_contracts(reader, ancestor, method, kind)?,
        });
    }
    Ok(levels)
}

/// Contracts of `kind` declared for `method` by the ancestors of `class`,
/// nearest first. Not deduplicated.
pub fn fetch_parent_contracts(
    reader: &dyn MetadataReader,
    class: ClassId,
    method: &str,
    kind: ContractKind,
) -> Result<Vec<ContractDecl>, CoreError> {
    let mut contracts = Vec::new();
    for ancestor in reader.ancestors(class)? {
        contracts.extend(declared_contracts(reader, ancestor, method, kind)?);
    }
    Ok(contracts)
}

/// The merged, deduplicated contract set of `kind` for `method` as seen from
/// `class`: own declarations first, then inherited ones.
pub fn fetch_all_contracts(
    reader: &dyn MetadataReader,
    class: ClassId,
    method: &str,
    kind: ContractKind,
) -> Result<Vec<ContractDecl>, CoreError> {
    let mut contracts = declared_contracts(reader, class, method, kind)?;
    contracts.extend(fetch_parent_contracts(reader, class, method, kind)?);
    let merged = dedup_contracts(contracts);
    tracing::debug!(
        class = %reader.class(class)?.name,
        method,
        %kind,
        count = merged.len(),
        "merged contract set"
    );
    Ok(merged)
}

/// Invariants of `class` and all of its ancestors, deduplicated.
pub fn fetch_class_invariants(
    reader: &dyn MetadataReader,
    class: ClassId,
) -> Result<Vec<ContractDecl>, CoreError> {
    let mut invariants = reader.class(class)?.invariants.clone();
    for ancestor in reader.ancestors(class)? {
        invariants.extend(reader.class(ancestor)?.invariants.iter().cloned());
    }
    Ok(dedup_contracts(invariants))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::{ClassKind, ClassRegistry, Param};

    /// Shape <- Square, Square implements Sized; all declare `scale`.
    fn shapes() -> (ClassRegistry, ClassId, ClassId, ClassId) {
        let mut reg = ClassRegistry::new();
        let shape = reg.add_class("Shape", ClassKind::Class, true).unwrap();
        let square = reg.add_class("Square", ClassKind::Class, true).unwrap();
        let sized = reg.add_class("Sized", ClassKind::Interface, false).unwrap();
        reg.set_parent(square, shape).unwrap();
        reg.add_interface(square, sized).unwrap();

        let base = reg.add_method(shape, "scale", [Param::new("k")]).unwrap();
        reg.add_contract(base, ContractKind::Postcondition, "$__result > 0").unwrap();
        reg.add_contract(base, ContractKind::Precondition, "$k > 0").unwrap();
        let iface = reg.add_method(sized, "scale", [Param::new("k")]).unwrap();
        reg.add_contract(iface, ContractKind::Postcondition, "$__result  >  0").unwrap();
        reg.add_contract(iface, ContractKind::Postcondition, "$__result < 1000").unwrap();
        let own = reg.add_method(square, "scale", [Param::new("k")]).unwrap();
        reg.add_contract(own, ContractKind::Postcondition, "!is_null($__result)").unwrap();

        reg.add_invariant(shape, "$this->side >= 0").unwrap();
        reg.add_invariant(square, "$this->side >= 0").unwrap();
        reg.add_invariant(square, "$this->side < 100").unwrap();
        (reg, shape, square, sized)
    }

    #[test]
    fn own_contracts_come_before_inherited_ones() {
        let (reg, _, square, _) = shapes();
        let all = fetch_all_contracts(&reg, square, "scale", ContractKind::Postcondition).unwrap();
        let exprs: Vec<&str> = all.iter().map(|c| c.expression.as_str()).collect();
        assert_eq!(exprs, vec!["!is_null($__result)", "$__result > 0", "$__result < 1000"]);
        assert_eq!(all[1].source_class, "Shape");
    }

    #[test]
    fn parent_contracts_exclude_own_and_keep_duplicates() {
        let (reg, _, square, _) = shapes();
        let parents =
            fetch_parent_contracts(&reg, square, "scale", ContractKind::Postcondition).unwrap();
        assert_eq!(parents.len(), 3);
        assert!(parents.iter().all(|c| c.source_class != "Square"));
    }

    #[test]
    fn levels_keep_empty_groups() {
        let (reg, shape, square, sized) = shapes();
        let levels =
            fetch_contract_levels(&reg, square, "scale", ContractKind::Precondition).unwrap();
        let shape_of: Vec<(ClassId, usize)> =
            levels.iter().map(|l| (l.class, l.contracts.len())).collect();
        assert_eq!(shape_of, vec![(square, 0), (shape, 1), (sized, 0)]);
    }

    #[test]
    fn inherited_only_method_still_collects_ancestor_contracts() {
        let mut reg = ClassRegistry::new();
        let base = reg.add_class("Base", ClassKind::Class, true).unwrap();
        let child = reg.add_class("Child", ClassKind::Class, true).unwrap();
        reg.set_parent(child, base).unwrap();
        let run = reg.add_method(base, "run", []).unwrap();
        reg.add_contract(run, ContractKind::Postcondition, "$__result").unwrap();

        let all = fetch_all_contracts(&reg, child, "run", ContractKind::Postcondition).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn invariants_accumulate_and_dedup() {
        let (reg, shape, square, _) = shapes();
        let invs = fetch_class_invariants(&reg, square).unwrap();
        let exprs: Vec<&str> = invs.iter().map(|c| c.expression.as_str()).collect();
        assert_eq!(exprs, vec!["$this->side >= 0", "$this->side < 100"]);
        assert_eq!(invs[0].source_class, "Square");
        assert_eq!(fetch_class_invariants(&reg, shape).unwrap().len(), 1);
    }
}
