use std::collections::HashMap;

use crate::model::Changeset;

/// Links each changeset to the parents it declares, in both directions.
///
/// Edges are stored as positions in `changesets`. Parents outside the
/// fetched window are dropped.
pub fn link(changesets: &mut [Changeset]) {
    let by_rev: HashMap<String, usize> = changesets
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.rev.clone().map(|r| (r, i)))
        .collect();

    for c in changesets.iter_mut() {
        c.parent_revs.clear();
        c.child_revs.clear();
    }

    for child in 0..changesets.len() {
        let resolved: Vec<usize> = changesets[child]
            .parents
            .iter()
            .filter_map(|p| by_rev.get(p).copied())
            .collect();
        for parent in resolved {
            changesets[parent].child_revs.push(child);
            changesets[child].parent_revs.push(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_changesets;

    fn revs(changesets: &[Changeset], idx: &[usize]) -> Vec<String> {
        idx.iter()
            .filter_map(|&i| changesets[i].rev.clone())
            .collect()
    }

    #[test]
    fn builds_symmetric_dag() {
        let mut cs = parse_changesets(
            "\
changeset: m
parent: b1
parent: b2
changeset: b2
parent: r
changeset: b1
parent: r
changeset: r
parent: 000000000000
",
        );
        link(&mut cs);

        assert_eq!(revs(&cs, &cs[0].parent_revs), ["b1", "b2"]);
        assert_eq!(revs(&cs, &cs[3].child_revs), ["b2", "b1"]);
        assert!(cs[3].parent_revs.is_empty());

        for (a, ca) in cs.iter().enumerate() {
            for (b, cb) in cs.iter().enumerate() {
                assert_eq!(ca.child_revs.contains(&b), cb.parent_revs.contains(&a));
            }
        }
    }

    #[test]
    fn drops_parents_outside_window() {
        let mut cs = parse_changesets("changeset: a\nparent: zz99\n");
        link(&mut cs);
        assert!(cs[0].parent_revs.is_empty());
        assert_eq!(cs[0].parents, ["zz99"]);
    }

    #[test]
    fn relinking_does_not_duplicate_edges() {
        let mut cs = parse_changesets("changeset: b\nparent: a\nchangeset: a\n");
        link(&mut cs);
        link(&mut cs);
        assert_eq!(cs[0].parent_revs, [1]);
        assert_eq!(cs[1].child_revs, [0]);
    }
}
