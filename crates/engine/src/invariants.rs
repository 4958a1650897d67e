#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
	ClassDef, CompileCx, Definition, Engine, Error, LayerResult, LayerTarget, ModuleDef,
};

fn word(engine: &Engine, base: &'static str) -> ClassDef<String> {
	engine.define_class(move |_| Ok(base.to_string()))
}

fn append(
	tag: &'static str,
) -> impl Fn(&mut CompileCx<'_>, String) -> LayerResult<String> + Send + Sync + 'static {
	move |_: &mut CompileCx<'_>, prev: String| Ok(format!("{prev}{tag}"))
}

/// Invariant: Enabled layers fold in slot order.
///
/// Toggling a slot MUST NOT move any other slot; the fold visits enabled slots
/// in ascending order.
pub(crate) fn inv_layers_fold_in_slot_order() {
	let engine = Engine::new();
	let def = word(&engine, "0");
	let exts: Vec<_> = ["1", "2", "3", "4"]
		.into_iter()
		.map(|tag| engine.add_layer(&def, append(tag)).unwrap())
		.collect();

	exts[0].remove().unwrap();
	exts[2].remove().unwrap();
	assert_eq!(*engine.compile(&def).unwrap(), "024");

	exts[2].reapply().unwrap();
	exts[0].reapply().unwrap();
	assert_eq!(*engine.compile(&def).unwrap(), "01234");
}

#[cfg_attr(test, test)]
pub(crate) fn test_layers_fold_in_slot_order() {
	inv_layers_fold_in_slot_order()
}

/// Invariant: A cached artifact is returned by identity.
///
/// Repeated compiles without an intervening mutation MUST NOT rerun any layer.
pub(crate) fn inv_cache_returns_same_artifact() {
	let engine = Engine::new();
	let runs = Arc::new(AtomicUsize::new(0));
	let seen = Arc::clone(&runs);
	let def = word(&engine, "x");
	engine
		.add_layer(&def, move |_, prev: String| {
			seen.fetch_add(1, Ordering::SeqCst);
			Ok(prev)
		})
		.unwrap();

	let first = engine.compile(&def).unwrap();
	let second = engine.compile(&def).unwrap();
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[cfg_attr(test, test)]
pub(crate) fn test_cache_returns_same_artifact() {
	inv_cache_returns_same_artifact()
}

/// Invariant: Mutations cascade to transitive parents.
///
/// If `top` compiled through `mid` and `mid` through `leaf`, adding a layer to
/// `leaf` MUST evict all three.
pub(crate) fn inv_cascade_reaches_transitive_parents() {
	let engine = Engine::new();
	let leaf = word(&engine, "leaf");
	let mid = engine.define_class(move |cx| Ok(format!("mid<{}>", cx.compile(&leaf)?)));
	let top = engine.define_module(move |cx| Ok(format!("top<{}>", cx.compile(&mid)?)));

	assert_eq!(*engine.compile(&top).unwrap(), "top<mid<leaf>>");
	engine.add_layer(&leaf, append("!")).unwrap();

	assert!(!engine.is_cached(&leaf));
	assert!(!engine.is_cached(&mid));
	assert!(!engine.is_cached(&top));
	assert_eq!(*engine.compile(&top).unwrap(), "top<mid<leaf!>>");
}

#[cfg_attr(test, test)]
pub(crate) fn test_cascade_reaches_transitive_parents() {
	inv_cascade_reaches_transitive_parents()
}

/// Invariant: Invalidation is scoped to the affected subgraph.
///
/// Siblings and children of the mutated definition MUST stay cached.
pub(crate) fn inv_cascade_is_scoped() {
	let engine = Engine::new();
	let child = word(&engine, "child");
	let target = engine.define_class(move |cx| Ok(format!("t<{}>", cx.compile(&child)?)));
	let sibling = word(&engine, "sibling");
	let top: ModuleDef<String> = engine.define_module(move |cx| {
		Ok(format!("{}+{}", cx.compile(&target)?, cx.compile(&sibling)?))
	});

	engine.compile(&top).unwrap();
	let cascade = engine.invalidate(&target).unwrap();

	assert_eq!(cascade.evicted, 2);
	assert!(engine.is_cached(&child));
	assert!(engine.is_cached(&sibling));
	assert!(!engine.is_cached(&top));
}

#[cfg_attr(test, test)]
pub(crate) fn test_cascade_is_scoped() {
	inv_cascade_is_scoped()
}

/// Invariant: Parent edges are unique per pair.
///
/// Compiling the same dependency many times from one parent MUST record a
/// single edge.
pub(crate) fn inv_parent_edges_dedup() {
	let engine = Engine::new();
	let leaf = word(&engine, "leaf");
	let parent = engine.define_class(move |cx| {
		for _ in 0..5 {
			cx.compile(&leaf)?;
		}
		Ok(String::new())
	});

	engine.compile(&parent).unwrap();
	engine.invalidate(&parent).unwrap();
	engine.compile(&parent).unwrap();
	assert_eq!(engine.parents(&leaf).unwrap(), vec![parent.id()]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_parent_edges_dedup() {
	inv_parent_edges_dedup()
}

/// Invariant: Multi-target layers require a shared origin.
///
/// A rejected target list MUST NOT add a slot to any definition.
pub(crate) fn inv_origin_mismatch_rejected() {
	let engine = Engine::new();
	let a = word(&engine, "a");
	let b = word(&engine, "b");

	let err = engine.add_layer(&[a, b], append("x")).unwrap_err();
	assert!(matches!(err, Error::OriginMismatch { .. }));
	let mixed: [&dyn LayerTarget<String>; 2] = [&a, &b];
	assert!(engine.add_layer(&mixed, append("x")).is_err());

	assert_eq!(engine.layer_count(&a).unwrap(), 1);
	assert_eq!(engine.layer_count(&b).unwrap(), 1);
}

#[cfg_attr(test, test)]
pub(crate) fn test_origin_mismatch_rejected() {
	inv_origin_mismatch_rejected()
}

/// Invariant: A failed compile caches nothing and unwinds its frames.
pub(crate) fn inv_failed_compile_unwinds() {
	let engine = Engine::new();
	let leaf = word(&engine, "leaf");
	let broken = engine.define_class(move |cx| -> LayerResult<String> {
		cx.compile(&leaf)?;
		Err("broken".into())
	});
	let top = engine.define_module(move |cx| Ok(cx.compile(&broken)?.len()));

	let mut cx = engine.context();
	assert!(cx.compile(&top).is_err());
	assert_eq!(cx.depth(), 0);
	assert!(!engine.is_cached(&top));
	assert!(!engine.is_cached(&broken));
	assert!(engine.is_cached(&leaf));

	// Later passes attribute to the right parent.
	let other = engine.define_module(move |cx| Ok(cx.compile(&leaf)?.len()));
	engine.compile(&other).unwrap();
	assert_eq!(engine.parents(&leaf).unwrap(), vec![broken.id(), other.id()]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_failed_compile_unwinds() {
	inv_failed_compile_unwinds()
}

/// Invariant: A result computed across an invalidation is not cached.
///
/// If a definition is invalidated while its own layers are running, the value
/// they return MUST be handed back but MUST NOT be stored.
pub(crate) fn inv_stale_result_not_cached() {
	let engine = Engine::new();
	let runs = Arc::new(AtomicUsize::new(0));
	let seen = Arc::clone(&runs);
	let me: Arc<std::sync::OnceLock<ModuleDef<usize>>> = Arc::default();
	let slot = Arc::clone(&me);
	let def = engine.define_module(move |cx| {
		let n = seen.fetch_add(1, Ordering::SeqCst);
		if n == 0 {
			let this = slot.get().ok_or("definition not installed")?;
			cx.engine().invalidate(this)?;
		}
		Ok(n)
	});
	me.set(def).unwrap();

	assert_eq!(*engine.compile(&def).unwrap(), 0);
	assert!(!engine.is_cached(&def));
	assert_eq!(*engine.compile(&def).unwrap(), 1);
	assert!(engine.is_cached(&def));
}

#[cfg_attr(test, test)]
pub(crate) fn test_stale_result_not_cached() {
	inv_stale_result_not_cached()
}
