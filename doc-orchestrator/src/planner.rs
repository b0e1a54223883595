//! Topological task planning over containment and reference edges.
//!
//! Candidates are taken depth-ascending so leaves come first; each round
//! picks the candidate with the fewest outstanding non-special reference
//! dependencies (a candidate with nothing outstanding short-circuits). A
//! pick with a positive minimum is a broken cycle: it is logged and the
//! outstanding references become soft: the task only depends on work that
//! already has an id.

use crate::executor::TaskManager;
use doctree_prep::{ItemId, MetaInfo};
use std::collections::HashSet;
use tracing::{info, warn};

/// Derive the task set for every symbol `needs_doc` accepts (restricted to
/// the whitelist when one is configured). Writes `task_id`/`has_task` back
/// onto the tree.
pub fn plan_tasks(meta: &mut MetaInfo, ignore_list: &[String]) -> TaskManager {
    for id in meta.tree.preorder() {
        let item = meta.tree.get_mut(id);
        item.task_id = -1;
        item.has_task = false;
    }

    let mut candidates: Vec<ItemId> = meta
        .tree
        .preorder()
        .into_iter()
        .filter(|&id| meta.tree.needs_doc(id, ignore_list))
        .collect();

    if let Some(whitelist) = &meta.whitelist {
        candidates.retain(|&id| {
            let item = meta.tree.get(id);
            let name = item
                .content
                .as_ref()
                .map(|r| r.name.as_str())
                .unwrap_or(item.name.as_str());
            let file = meta
                .tree
                .enclosing_file(id)
                .map(|f| meta.tree.full_name(f))
                .unwrap_or_default();
            whitelist
                .iter()
                .any(|entry| entry.file_path == file && entry.id_text == name)
        });
    }

    candidates.sort_by_key(|&id| meta.tree.get(id).depth);

    let manager = TaskManager::new();
    let mut dealt: HashSet<ItemId> = HashSet::new();

    while !candidates.is_empty() {
        let mut target_pos = 0;
        let mut min_break_level = i64::MAX;

        for (pos, &id) in candidates.iter().enumerate() {
            let mut outstanding_total = 0i64;
            let mut outstanding_nonspecial = 0i64;

            let item = meta.tree.get(id);
            for &child in item.children.values() {
                if meta.tree.needs_doc(child, ignore_list) && !dealt.contains(&child) {
                    outstanding_total += 1;
                }
            }
            for (&referee, &special) in item
                .references_from_this
                .iter()
                .zip(&item.special_reference_flags)
            {
                if meta.tree.needs_doc(referee, ignore_list) && !dealt.contains(&referee) {
                    outstanding_total += 1;
                    if !special {
                        outstanding_nonspecial += 1;
                    }
                }
            }

            if outstanding_total == 0 {
                target_pos = pos;
                min_break_level = -1;
                break;
            }
            if outstanding_nonspecial < min_break_level {
                min_break_level = outstanding_nonspecial;
                target_pos = pos;
            }
        }

        let target = candidates.remove(target_pos);
        if min_break_level > 0 {
            warn!(
                item = %meta.tree.full_name(target),
                outstanding = min_break_level,
                "breaking reference cycle; outstanding references become soft"
            );
        }

        let mut dep_ids: Vec<i64> = Vec::new();
        let item = meta.tree.get(target);
        for &child in item.children.values() {
            let child_task = meta.tree.get(child).task_id;
            if child_task != -1 {
                dep_ids.push(child_task);
            }
        }
        for &referee in &item.references_from_this {
            let referee_task = meta.tree.get(referee).task_id;
            if referee_task != -1 && manager.contains(referee_task) {
                dep_ids.push(referee_task);
            }
        }

        let task_id = manager.add_task(&dep_ids, target);
        let target_item = meta.tree.get_mut(target);
        target_item.task_id = task_id;
        target_item.has_task = true;
        dealt.insert(target);
    }

    info!(tasks = manager.len(), "task plan derived");
    manager
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctree_prep::{DocItemStatus, SymbolKindTag, SymbolRecord, WhitelistEntry};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn record(name: &str, start: i64, end: i64) -> SymbolRecord {
        SymbolRecord::parsed(SymbolKindTag::FunctionDef, name, start, end, 4, vec![], false, name)
    }

    fn meta_of(records: Vec<SymbolRecord>) -> MetaInfo {
        let mut files = BTreeMap::new();
        files.insert("a.py".to_string(), records);
        MetaInfo::init(PathBuf::from("/repo"), &files, BTreeMap::new(), vec![]).unwrap()
    }

    fn drain_order(manager: &TaskManager, meta: &MetaInfo) -> Vec<String> {
        let mut order = Vec::new();
        while let Some(pickup) = manager.next(0) {
            order.push(meta.tree.full_name(pickup.payload));
            manager.complete(pickup.task_id);
        }
        assert!(manager.all_success());
        order
    }

    #[test]
    fn producer_is_scheduled_before_consumer() {
        let mut meta = meta_of(vec![record("f", 1, 3), record("g", 5, 8)]);
        let f = meta.tree.find(&["a.py", "f"]).unwrap();
        let g = meta.tree.find(&["a.py", "g"]).unwrap();
        meta.tree.add_reference(g, f, false);

        let manager = plan_tasks(&mut meta, &[]);
        assert_eq!(manager.len(), 2);
        let order = drain_order(&manager, &meta);
        assert_eq!(order, vec!["a.py/f".to_string(), "a.py/g".to_string()]);
    }

    #[test]
    fn children_precede_their_parent() {
        let mut files = BTreeMap::new();
        files.insert(
            "a.py".to_string(),
            vec![
                SymbolRecord::parsed(SymbolKindTag::ClassDef, "C", 1, 20, 6, vec![], false, ""),
                record("m", 2, 10),
            ],
        );
        let mut meta = MetaInfo::init(PathBuf::from("/repo"), &files, BTreeMap::new(), vec![]).unwrap();
        let manager = plan_tasks(&mut meta, &[]);
        let order = drain_order(&manager, &meta);
        assert_eq!(order, vec!["a.py/C/m".to_string(), "a.py/C".to_string()]);
    }

    #[test]
    fn up_to_date_items_get_no_task() {
        let mut meta = meta_of(vec![record("f", 1, 3), record("g", 5, 8)]);
        let f = meta.tree.find(&["a.py", "f"]).unwrap();
        meta.tree.get_mut(f).status = DocItemStatus::UpToDate;
        let manager = plan_tasks(&mut meta, &[]);
        assert_eq!(manager.len(), 1);
        assert_eq!(meta.tree.get(f).task_id, -1);
    }

    #[test]
    fn mutual_references_break_exactly_one_edge() {
        let mut meta = meta_of(vec![record("p", 1, 4), record("q", 6, 9)]);
        let p = meta.tree.find(&["a.py", "p"]).unwrap();
        let q = meta.tree.find(&["a.py", "q"]).unwrap();
        meta.tree.add_reference(p, q, false);
        meta.tree.add_reference(q, p, false);

        let manager = plan_tasks(&mut meta, &[]);
        assert_eq!(manager.len(), 2);
        // One task must be free, the other may depend on it; both drain.
        let blocked: Vec<usize> = manager
            .overview()
            .iter()
            .map(|(_, _, deps)| deps.len())
            .collect();
        assert!(blocked.iter().filter(|&&d| d == 0).count() >= 1);
        let order = drain_order(&manager, &meta);
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn special_references_do_not_count_against_a_candidate() {
        let mut meta = meta_of(vec![record("p", 1, 4), record("q", 6, 9)]);
        let p = meta.tree.find(&["a.py", "p"]).unwrap();
        let q = meta.tree.find(&["a.py", "q"]).unwrap();
        // p -> q at q's definition line (special); q -> p at a call site.
        meta.tree.add_reference(p, q, true);
        meta.tree.add_reference(q, p, false);

        let manager = plan_tasks(&mut meta, &[]);
        // p's only outstanding dependency is special, so p is picked first
        // and q depends on it.
        let order = drain_order(&manager, &meta);
        assert_eq!(order, vec!["a.py/p".to_string(), "a.py/q".to_string()]);
    }

    #[test]
    fn whitelist_restricts_candidates() {
        let mut meta = meta_of(vec![record("f", 1, 3), record("g", 5, 8)]);
        meta.whitelist = Some(vec![WhitelistEntry {
            file_path: "a.py".to_string(),
            id_text: "f".to_string(),
        }]);
        let manager = plan_tasks(&mut meta, &[]);
        assert_eq!(manager.len(), 1);
        let order = drain_order(&manager, &meta);
        assert_eq!(order, vec!["a.py/f".to_string()]);
    }

    #[test]
    fn ignore_list_prunes_whole_prefixes() {
        let mut meta = meta_of(vec![record("f", 1, 3)]);
        let manager = plan_tasks(&mut meta, &["a.py".to_string()]);
        assert!(manager.is_empty());
    }
}
