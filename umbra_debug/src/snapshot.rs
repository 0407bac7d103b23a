// Copyright 2026 the Umbra Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshots of a scene graph cache.
//!
//! [`snapshot`] renders the flattened order with every node's subtree range
//! and per-pass command span as a [`serde_json::Value`]:
//!
//! ```json
//! {
//!   "build_index": 3,
//!   "passes": [1, 2],
//!   "nodes": [
//!     { "index": 7, "generation": 0, "name": "root", "subtree": [0, 4],
//!       "spans": [[0, 1, 5, 6], [0, 0, 2, 2]] }
//!   ]
//! }
//! ```
//!
//! Spans are `[pre_start, body_start, body_end, post_end]`, one per pass in
//! `passes` order. Snapshots are for diagnostics only and carry no stability
//! guarantee.

use std::io::{self, Write};

use serde_json::{Value, json};

use umbra_core::cache::SceneGraphCache;
use umbra_core::node::SceneTree;

/// Builds a JSON view of `cache`, taking node names from `tree`.
///
/// # Panics
///
/// Panics if the cache refers to nodes destroyed since its last build.
#[must_use]
pub fn snapshot<T>(cache: &SceneGraphCache, tree: &SceneTree<T>) -> Value {
    let passes = cache.passes();
    let nodes: Vec<Value> = cache
        .nodes()
        .iter()
        .zip(cache.subtree_ends())
        .enumerate()
        .map(|(pos, (&node, &end))| {
            let spans: Vec<Value> = passes
                .iter()
                .map(|&pass| {
                    let s = cache.spans(pass)[pos];
                    json!([s.pre_start, s.body_start, s.body_end, s.post_end])
                })
                .collect();
            json!({
                "index": node.index(),
                "generation": node.generation(),
                "name": tree.name(node),
                "subtree": [pos, end],
                "spans": spans,
            })
        })
        .collect();

    json!({
        "build_index": cache.build_index(),
        "passes": passes.iter().map(|p| p.bits()).collect::<Vec<_>>(),
        "nodes": nodes,
    })
}

/// Writes [`snapshot`] as pretty-printed JSON.
pub fn write_snapshot<T>(
    cache: &SceneGraphCache,
    tree: &SceneTree<T>,
    writer: &mut dyn Write,
) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, &snapshot(cache, tree))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::command::{Command, CommandFilter};

    struct Fill(CommandFilter);

    impl Command for Fill {
        fn filter(&self) -> CommandFilter {
            self.0
        }
    }

    #[test]
    fn snapshot_lists_nodes_and_spans() {
        let mut tree: SceneTree<Fill> = SceneTree::new();
        let root = tree.create_renderable();
        tree.set_name(root, "root");
        tree.commands_mut(root).add_pre(Fill(CommandFilter::COLOR));
        tree.commands_mut(root).add_post(Fill(CommandFilter::ENCODE));
        let child = tree.create_renderable();
        tree.commands_mut(child).add(Fill(CommandFilter::COLOR));
        tree.append_child(root, child);

        let mut cache =
            SceneGraphCache::new(root, &[CommandFilter::COLOR, CommandFilter::ENCODE]);
        cache.build(&mut tree);

        let mut out = Vec::new();
        write_snapshot(&cache, &tree, &mut out).unwrap();
        let parsed: Value = serde_json::from_str(&String::from_utf8(out).unwrap()).unwrap();

        assert_eq!(parsed["build_index"], 1);
        assert_eq!(parsed["passes"], json!([1, 2]));
        let nodes = parsed["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["name"], "root");
        assert_eq!(nodes[0]["subtree"], json!([0, 2]));
        assert_eq!(nodes[0]["spans"], json!([[0, 1, 2, 2], [0, 0, 0, 1]]));
        assert_eq!(nodes[1]["name"], Value::Null);
        assert_eq!(nodes[1]["spans"][0], json!([1, 2, 2, 2]));
    }

    #[test]
    fn snapshot_of_unbuilt_cache_is_empty() {
        let mut tree: SceneTree<Fill> = SceneTree::new();
        let root = tree.create_node();
        let cache = SceneGraphCache::new(root, &[]);
        let value = snapshot(&cache, &tree);
        assert_eq!(value["nodes"], json!([]));
        assert_eq!(value["build_index"], 0);
    }
}
