use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use stratum_engine::{Class, ClassDef, Definition, Error, LayerTarget, Mixin, mix_with};

use crate::common::{Val, ValClass, class_layer, engine, plain_class, prefixed};

#[rstest]
#[case(&[true, true], "A2 -> A1 -> A")]
#[case(&[false, true], "A2 -> A")]
#[case(&[true, false], "A1 -> A")]
#[case(&[false, false], "A")]
fn name_chain_follows_active_extensions(#[case] active: &[bool], #[case] expected: &str) {
	let engine = engine();
	let a = engine.define_class(|_| Ok(plain_class("A")));
	let exts = [
		engine.add_layer(&a, class_layer("A1 -> ")).unwrap(),
		engine.add_layer(&a, class_layer("A2 -> ")).unwrap(),
	];
	for (ext, on) in exts.iter().zip(active) {
		if !on {
			ext.remove().unwrap();
		}
	}

	assert_eq!(engine.create(&a, ()).unwrap().val(), expected);
}

#[test]
fn dependent_class_sees_dependency_changes() {
	let engine = engine();
	let a = engine.define_class(|_| Ok(plain_class("A")));
	let b = engine.define_class(move |cx| Ok(prefixed(&*cx.compile(&a)?, "B -> ")));
	let a1 = engine.add_layer(&a, class_layer("A1 -> ")).unwrap();
	let a2 = engine.add_layer(&a, class_layer("A2 -> ")).unwrap();

	assert_eq!(engine.create(&b, ()).unwrap().val(), "B -> A2 -> A1 -> A");
	assert_eq!(engine.parents(&a).unwrap(), vec![b.id()]);

	a1.remove().unwrap();
	assert!(!engine.is_cached(&b));
	assert_eq!(engine.create(&b, ()).unwrap().val(), "B -> A2 -> A");

	a2.remove().unwrap();
	a1.reapply().unwrap();
	assert_eq!(engine.create(&b, ()).unwrap().val(), "B -> A1 -> A");

	let b2 = engine.add_layer(&b, class_layer("B2 -> ")).unwrap();
	assert_eq!(engine.create(&b, ()).unwrap().val(), "B2 -> B -> A1 -> A");

	a1.remove().unwrap();
	b2.remove().unwrap();
	assert_eq!(engine.create(&b, ()).unwrap().val(), "B -> A");

	a1.reapply().unwrap();
	a2.reapply().unwrap();
	b2.reapply().unwrap();
	assert_eq!(engine.create(&b, ()).unwrap().val(), "B2 -> B -> A2 -> A1 -> A");
}

#[test]
fn extensions_stack_across_a_hierarchy() {
	let engine = engine();
	let a = engine.define_class(|_| Ok(plain_class("A0")));
	let b = engine.define_class(move |cx| Ok(suffixed(&*cx.compile(&a)?, "B0")));
	let c = engine.define_class(move |cx| Ok(suffixed(&*cx.compile(&b)?, "C0")));
	let d = engine.define_class(move |cx| Ok(suffixed(&*cx.compile(&a)?, "D0")));

	for (target, tag) in [(a, "A1"), (a, "A2"), (c, "C1"), (b, "B1")] {
		engine
			.add_layer(&target, move |_, class: ValClass| Ok(suffixed(&class, tag)))
			.unwrap();
	}

	let val = |def: &ClassDef<ValClass>| engine.create(def, ()).unwrap().val();
	assert_eq!(val(&a), "A0A1A2");
	assert_eq!(val(&b), "A0A1A2B0B1");
	assert_eq!(val(&c), "A0A1A2B0B1C0C1");
	assert_eq!(val(&d), "A0A1A2D0");
}

fn suffixed(class: &ValClass, suffix: &'static str) -> ValClass {
	struct Suffixed(Box<dyn Val>, &'static str);
	impl Val for Suffixed {
		fn val(&self) -> String {
			format!("{}{}", self.0.val(), self.1)
		}
	}
	class.map(move |inner| Ok(Box::new(Suffixed(inner, suffix)) as Box<dyn Val>))
}

#[test]
fn module_rebuilds_when_created_class_changes() {
	let engine = engine();
	let h = engine.define_class(|_| Ok(plain_class("hello")));
	let m = engine.define_module(move |cx| {
		let greeting = cx.create(&h, ())?;
		Ok(greeting.val().len())
	});

	assert_eq!(*engine.compile(&m).unwrap(), 5);
	let ext = engine.add_layer(&h, class_layer("well, ")).unwrap();
	assert!(!engine.is_cached(&h));
	assert!(!engine.is_cached(&m));
	assert_eq!(*engine.compile(&m).unwrap(), 11);

	ext.remove().unwrap();
	assert_eq!(*engine.compile(&m).unwrap(), 5);
}

trait Bar: Send + Sync {
	fn bar(&self) -> String;
}

struct X;

impl Bar for X {
	fn bar(&self) -> String {
		"x".to_string()
	}
}

struct Over(&'static str, Box<dyn Bar>);

impl Bar for Over {
	fn bar(&self) -> String {
		format!("{}({})", self.0, self.1.bar())
	}
}

type BarClass = Class<(), Box<dyn Bar>>;

fn over(tag: &'static str) -> Mixin<BarClass> {
	Mixin::new(move |base: BarClass| {
		Ok(base.map(move |inner| Ok(Box::new(Over(tag, inner)) as Box<dyn Bar>)))
	})
}

#[test]
fn last_listed_mixin_wins_and_chains_to_earlier_ones() {
	let engine = engine();
	let m1 = engine.define_mixin(|_| Ok(over("m1")));
	let m2 = engine.define_mixin(|_| Ok(over("m2")));
	let mixed = engine.define_class(move |cx| {
		let base: BarClass = Class::new(|()| Ok(Box::new(X) as Box<dyn Bar>));
		let mixins = [cx.compile(&m1)?, cx.compile(&m2)?];
		mix_with(base, &mixins)
	});

	assert_eq!(engine.create(&mixed, ()).unwrap().bar(), "m2(m1(x))");

	engine
		.add_layer(&m1, |_, mixin: Mixin<BarClass>| Ok(mixin.and(&over("m1+"))))
		.unwrap();
	assert!(!engine.is_cached(&mixed));
	assert!(engine.is_cached(&m2));
	assert_eq!(engine.create(&mixed, ()).unwrap().bar(), "m2(m1+(m1(x)))");
}

#[test]
fn mixin_artifact_is_shared_until_changed() {
	let engine = engine();
	let m = engine.define_mixin(|_| Ok(over("m")));
	let first = engine.compile(&m).unwrap();
	assert!(Arc::ptr_eq(&first, &engine.compile(&m).unwrap()));
	engine.invalidate(&m).unwrap();
	assert!(!first.ptr_eq(&engine.compile(&m).unwrap()));
}

#[test]
fn classes_defined_while_compiling_are_patchable() {
	let engine = engine();
	let factory = engine.define_module(|_| {
		Ok(|name: &str| (name == "Field").then(|| plain_class("foo")))
	});
	let main = engine.define_class(move |cx| {
		let lookup = cx.compile(&factory)?;
		let field = cx
			.engine()
			.define_class(move |_| lookup("Field").ok_or_else(|| "no Field".into()));
		cx.engine().add_layer(&field, |_, class: ValClass| Ok(suffixed(&class, "extended")))?;
		Ok(cx.create(&field, ())?.val())
	});

	assert_eq!(*engine.compile(&main).unwrap(), "fooextended");
}

#[test]
fn heterogeneous_targets_must_share_an_origin() {
	let engine = engine();
	let a = engine.define_class(|_| Ok(plain_class("a")));
	let b = engine.define_class(|_| Ok(plain_class("b")));
	let a1 = engine.add_layer(&a, class_layer("1")).unwrap();
	let b1 = engine.add_layer(&b, class_layer("1")).unwrap();

	let same: [&dyn LayerTarget<ValClass>; 2] = [&a, &a1];
	assert!(engine.add_layer(&same, class_layer("2")).is_ok());

	let mixed: [&dyn LayerTarget<ValClass>; 3] = [&a1, &a, &b1];
	let err = engine.add_layer(&mixed, class_layer("x")).unwrap_err();
	assert!(matches!(
		err,
		Error::OriginMismatch { expected, found } if expected == a.id() && found == b.id()
	));
}
