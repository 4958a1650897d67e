//! Definition arena, artifact cache and invalidation cascade.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;

use crate::id::DefId;
use crate::kind::DefKind;
use crate::layer::LayerStack;

pub(crate) type Artifact = Arc<dyn Any + Send + Sync>;
pub(crate) type ParentSet = IndexSet<DefId, FxBuildHasher>;

pub(crate) struct Node {
	pub(crate) kind: DefKind,
	pub(crate) layers: LayerStack,
	pub(crate) artifact: Option<Artifact>,
	/// Definitions that were on top of the stack when this one was compiled,
	/// in the order they were first observed.
	pub(crate) parents: ParentSet,
	/// Bumped on every eviction; a compile only stores its result if the
	/// epoch it started from is still current.
	pub(crate) epoch: u64,
	/// Bumped on reset so extensions minted before it go stale.
	pub(crate) generation: u32,
}

/// Outcome of one invalidation cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cascade {
	/// Definitions visited, including the root.
	pub visited: usize,
	/// Cached artifacts actually dropped.
	pub evicted: usize,
}

#[derive(Default)]
pub(crate) struct Graph {
	nodes: Vec<Node>,
}

impl Graph {
	pub(crate) fn insert(&mut self, kind: DefKind, layers: LayerStack) -> DefId {
		let id = DefId::from_index(self.nodes.len());
		self.nodes.push(Node {
			kind,
			layers,
			artifact: None,
			parents: ParentSet::default(),
			epoch: 0,
			generation: 0,
		});
		id
	}

	#[inline]
	pub(crate) fn node(&self, id: DefId) -> &Node {
		&self.nodes[id.index()]
	}

	#[inline]
	pub(crate) fn node_mut(&mut self, id: DefId) -> &mut Node {
		&mut self.nodes[id.index()]
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Records `parent` as a dependent of `child`; duplicate edges collapse.
	pub(crate) fn record_parent(&mut self, child: DefId, parent: DefId) -> bool {
		self.node_mut(child).parents.insert(parent)
	}

	/// Evicts `root` and every definition that compiled through it.
	///
	/// Each visited node's parent set is taken before its parents are queued,
	/// so a node is expanded at most once per cascade even if recorded edges
	/// form a cycle.
	pub(crate) fn invalidate(&mut self, root: DefId) -> Cascade {
		let mut cascade = Cascade::default();
		let mut pending: SmallVec<[DefId; 16]> = SmallVec::new();
		pending.push(root);

		while let Some(id) = pending.pop() {
			let node = self.node_mut(id);
			node.epoch += 1;
			if node.artifact.take().is_some() {
				cascade.evicted += 1;
			}
			cascade.visited += 1;
			pending.extend(std::mem::take(&mut node.parents));
		}

		cascade
	}

	/// Clears every definition's layers, artifact and parent edges.
	pub(crate) fn reset(&mut self) {
		for node in &mut self.nodes {
			node.layers.clear();
			node.artifact = None;
			node.parents.clear();
			node.epoch += 1;
			node.generation += 1;
		}
	}
}
