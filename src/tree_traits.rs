use std::fmt::Display;

use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::RbTree;

/// Render a tree as a `termtree` for display and debugging.
pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

fn label<K: Display, V>(tree: &RbTree<K, V>, idx: Index) -> String {
    tree.node(idx)
        .map(|n| format!("{} ({})", n.key(), n.color()))
        .unwrap_or_default()
}

// Each node is labelled "key (color)"; absent children are shown as "nil"
// only when the sibling exists, so the left/right position stays readable.
impl<K: Display, V> TreeNodeConvert for RbTree<K, V> {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        if let Some(root_idx) = self.root() {
            let mut tree = Tree::new(label(self, root_idx));

            fn build_tree<K: Display, V>(
                rb: &RbTree<K, V>,
                node_idx: Index,
                parent_tree: &mut Tree<String>,
            ) {
                let Some(node) = rb.node(node_idx) else {
                    return;
                };
                if node.left().is_none() && node.right().is_none() {
                    return;
                }
                for child in [node.left(), node.right()] {
                    match child {
                        Some(child_idx) => {
                            let mut child_tree = Tree::new(label(rb, child_idx));
                            build_tree(rb, child_idx, &mut child_tree);
                            parent_tree.push(child_tree);
                        }
                        None => {
                            parent_tree.push(Tree::new("nil".to_string()));
                        }
                    }
                }
            }

            build_tree(self, root_idx, &mut tree);
            tree
        } else {
            Tree::new("Empty tree".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_tree_when_rendered_then_placeholder() {
        let tree: RbTree<i32, ()> = RbTree::new();
        assert_eq!(tree.to_tree_string().root, "Empty tree");
    }

    #[test]
    fn given_three_keys_when_rendered_then_root_and_two_children() {
        let mut tree = RbTree::new();
        for k in [1, 2, 3] {
            tree.insert(k, ()).unwrap();
        }
        let rendered = tree.to_tree_string();

        assert_eq!(rendered.root, "2 (black)");
        let leaves: Vec<_> = rendered.leaves.iter().map(|t| t.root.as_str()).collect();
        assert_eq!(leaves, vec!["1 (red)", "3 (red)"]);
    }

    #[test]
    fn given_node_with_one_child_when_rendered_then_missing_side_is_nil() {
        let mut tree = RbTree::new();
        for k in [1, 2] {
            tree.insert(k, ()).unwrap();
        }
        let rendered = tree.to_tree_string();

        assert_eq!(rendered.root, "1 (black)");
        let leaves: Vec<_> = rendered.leaves.iter().map(|t| t.root.as_str()).collect();
        assert_eq!(leaves, vec!["nil", "2 (red)"]);
        assert!(rendered.leaves[0].leaves.is_empty());
        assert!(rendered.to_string().contains("nil"));
    }
}
