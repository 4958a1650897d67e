use pretty_assertions::assert_eq;
use rstest::rstest;
use stratum_engine::{Class, DefKind, Definition, Error};
use stratum_registry::RegistryError;

use crate::common::registry;

#[test]
fn unregistered_names_fail_to_resolve() {
	let registry = registry();
	let err = registry.resolve::<u8>("missing").unwrap_err();
	assert!(matches!(err, RegistryError::Unregistered { ref name } if &**name == "missing"));
	assert!(matches!(
		registry.extend("missing", |_, v: u8| Ok(v)),
		Err(RegistryError::Unregistered { .. })
	));
	assert!(matches!(registry.is_cached("missing"), Err(RegistryError::Unregistered { .. })));
}

#[test]
fn duplicate_registration_keeps_the_first_definition() {
	let registry = registry();
	registry.module("config", |_| Ok(1u32)).unwrap();
	let err = registry.module("config", |_| Ok(2u32)).unwrap_err();
	assert!(matches!(err, RegistryError::Duplicate { .. }));
	assert_eq!(*registry.resolve::<u32>("config").unwrap(), 1);
	assert_eq!(registry.len(), 1);
	assert_eq!(registry.engine().len(), 1);
}

#[test]
fn modules_cannot_be_extended() {
	let registry = registry();
	registry.module("settings", |_| Ok(String::from("on"))).unwrap();
	let err = registry.extend("settings", |_, s: String| Ok(s)).unwrap_err();
	assert!(matches!(err, RegistryError::NotExtensible { .. }));
	assert_eq!(registry.kind("settings").unwrap(), DefKind::Module);
}

#[rstest]
#[case::module("m", DefKind::Module)]
#[case::mixin("x", DefKind::Mixin)]
fn only_classes_instantiate(#[case] name: &str, #[case] kind: DefKind) {
	let registry = registry();
	registry.module("m", |_| Ok(Class::new(|()| Ok(0u8)))).unwrap();
	registry
		.mixin("x", |_| Ok(stratum_engine::Mixin::<u8>::identity()))
		.unwrap();
	let err = registry.create::<Class<(), u8>>(name, ()).unwrap_err();
	assert!(matches!(err, RegistryError::NotInstantiable { kind: k, .. } if k == kind));
}

#[test]
fn wrong_artifact_type_is_reported() {
	let registry = registry();
	registry.module("n", |_| Ok(7u32)).unwrap();
	let err = registry.resolve::<String>("n").unwrap_err();
	match err {
		RegistryError::TypeMismatch { name, expected, found } => {
			assert_eq!(&*name, "n");
			assert_eq!(expected, "alloc::string::String");
			assert_eq!(found, "u32");
		}
		other => panic!("unexpected error: {other}"),
	}
	assert!(!registry.is_cached("n").unwrap());
}

#[test]
fn requiring_a_name_records_the_dependency() {
	let registry = registry();
	registry.module("base", |_| Ok(vec![1, 2, 3])).unwrap();
	registry
		.module("total", |scope| Ok(scope.require::<Vec<i32>>("base")?.iter().sum::<i32>()))
		.unwrap();
	registry
		.module("report", |scope| Ok(format!("total={}", scope.require::<i32>("total")?)))
		.unwrap();

	assert_eq!(*registry.resolve::<String>("report").unwrap(), "total=6");
	assert_eq!(registry.dependents("base").unwrap(), vec![Box::from("total")]);
	assert_eq!(registry.dependents("total").unwrap(), vec![Box::from("report")]);
	assert!(registry.dependents("report").unwrap().is_empty());

	let cascade = registry.invalidate("base").unwrap();
	assert_eq!(cascade.evicted, 3);
	for name in ["base", "total", "report"] {
		assert!(!registry.is_cached(name).unwrap(), "{name} still cached");
	}
}

#[test]
fn names_resolve_when_the_factory_runs() {
	let registry = registry();
	registry
		.module("user", |scope| Ok(format!("hello {}", scope.require::<String>("late")?)))
		.unwrap();

	let err = registry.resolve::<String>("user").unwrap_err();
	let RegistryError::Engine(Error::Layer { source, .. }) = err else {
		panic!("expected a layer failure");
	};
	assert!(matches!(
		source.downcast_ref::<RegistryError>(),
		Some(RegistryError::Unregistered { name }) if &**name == "late"
	));
	assert!(!registry.is_cached("user").unwrap());

	registry.module("late", |_| Ok(String::from("world"))).unwrap();
	assert_eq!(*registry.resolve::<String>("user").unwrap(), "hello world");
}

#[test]
fn nested_failures_point_at_the_failing_name() {
	let registry = registry();
	let leaf = registry
		.module::<u8, _>("leaf", |_| Err("boom".into()))
		.unwrap();
	registry
		.module("mid", |scope| Ok(*scope.require::<u8>("leaf")? + 1))
		.unwrap();
	registry
		.module("top", |scope| Ok(*scope.require::<u8>("mid")? + 1))
		.unwrap();

	let RegistryError::Engine(err) = registry.resolve::<u8>("top").unwrap_err() else {
		panic!("expected an engine error");
	};
	assert!(matches!(err.root_layer(), Error::Layer { def, .. } if *def == leaf.id()));
	assert_eq!(err.root_layer().to_string(), format!("module {} failed in layer 0", leaf.id()));
}

#[test]
fn extensions_by_name_remove_and_reapply() {
	let registry = registry();
	registry.define("greeting", |_| Ok(String::from("hi"))).unwrap();
	let loud = registry
		.extend("greeting", |_, s: String| Ok(s.to_uppercase()))
		.unwrap();
	registry
		.extend("greeting", |_, s: String| Ok(s + "!"))
		.unwrap();
	assert_eq!(*registry.resolve::<String>("greeting").unwrap(), "HI!");

	loud.remove().unwrap();
	assert_eq!(*registry.resolve::<String>("greeting").unwrap(), "hi!");
	loud.reapply().unwrap();
	assert_eq!(*registry.resolve::<String>("greeting").unwrap(), "HI!");
}

#[test]
fn names_keep_registration_order() {
	let registry = registry();
	for name in ["c", "a", "b"] {
		registry.module(name, |_| Ok(())).unwrap();
	}
	assert_eq!(registry.names(), vec![Box::from("c"), Box::from("a"), Box::from("b")]);
	assert!(registry.contains("a"));
	assert!(!registry.contains("d"));
}

#[test]
fn clones_share_names_and_engine() {
	let registry = registry();
	let other = registry.clone();
	other.module("shared", |_| Ok(5u8)).unwrap();
	assert!(registry.contains("shared"));
	assert_eq!(*registry.resolve::<u8>("shared").unwrap(), 5);
	assert!(other.is_cached("shared").unwrap());
	assert_eq!(registry.engine().id(), other.engine().id());
}

#[test]
fn reset_forgets_every_name() {
	let registry = registry();
	registry.define("a", |_| Ok(1u8)).unwrap();
	let ext = registry.extend("a", |_, v: u8| Ok(v + 1)).unwrap();
	assert_eq!(*registry.resolve::<u8>("a").unwrap(), 2);

	registry.reset();
	assert!(registry.is_empty());
	assert!(matches!(registry.resolve::<u8>("a"), Err(RegistryError::Unregistered { .. })));
	assert!(matches!(ext.reapply(), Err(Error::StaleExtension { .. })));

	registry.define("a", |_| Ok(10u8)).unwrap();
	assert_eq!(*registry.resolve::<u8>("a").unwrap(), 10);
}

#[test]
fn factories_outliving_their_registry_fail_cleanly() {
	let registry = registry();
	let def = registry.module("orphan", |_| Ok(1u8)).unwrap();
	let engine = registry.engine().clone();
	drop(registry);

	let Err(Error::Layer { source, .. }) = engine.compile(&def) else {
		panic!("expected a layer failure");
	};
	assert!(matches!(
		source.downcast_ref::<RegistryError>(),
		Some(RegistryError::Detached { name }) if &**name == "orphan"
	));
}

#[test]
fn typed_handles_and_names_mix() {
	let registry = registry();
	let engine = registry.engine().clone();
	registry.module("named", |_| Ok(20u32)).unwrap();
	let reg = registry.clone();
	let typed = engine.define_module(move |cx| Ok(*reg.require::<u32>(cx, "named")? + 1));

	assert_eq!(*engine.compile(&typed).unwrap(), 21);
	registry.invalidate("named").unwrap();
	assert!(!engine.is_cached(&typed));
}
