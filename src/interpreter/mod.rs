// The tree-walking interpreter's top-level shape (§6.1, §6.2).
//
// `Interpreter` bundles the host handlers and the shared
// `TypeRegistry` the way the teacher's `VM` bundles its `Program` and
// call stack; `invoke` is the single entry point an embedder calls,
// mirroring the teacher's `VM::exec` driving `VM::step` to
// completion.

mod expression;
mod imports;
mod invocation;
mod statement;

pub use invocation::ConditionContext;
pub use statement::Flow;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::activation::Activation;
use crate::ast::{Declaration, FunctionDecl, Program};
use crate::elaboration::TypeRegistry;
use crate::errors::{InterpreterError, Result};
use crate::host::{BaseActivationHandler, ContractValueHandler, ImportLocationHandler, Observer, UUIDHandler};
use crate::location::Location;
use crate::value::{FunctionRepr, FunctionValue, Value};

pub struct Interpreter<'a> {
    pub registry: &'a TypeRegistry,
    pub import_handler: &'a dyn ImportLocationHandler,
    pub contract_handler: &'a dyn ContractValueHandler,
    pub uuid_handler: &'a dyn UUIDHandler,
    pub base_activation_handler: &'a dyn BaseActivationHandler,
    pub observer: &'a mut dyn Observer,
    pub location: Location,
    pub globals: Rc<Activation>,
    /// Sub-interpreter globals, memoized per imported location so a
    /// location imported by several declarations is only ever
    /// evaluated once (§5 "interpreter import").
    sub_globals: RefCell<HashMap<Location, Rc<Activation>>>,
    /// Set while evaluating a function's post-conditions: maps the
    /// address of a `before(expr)` call's argument node to the value
    /// `expr` evaluated to just before the function body ran (§4.2.4
    /// "before()").
    pub(crate) before_snapshots: RefCell<Option<HashMap<usize, Value>>>,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        location: Location,
        registry: &'a TypeRegistry,
        import_handler: &'a dyn ImportLocationHandler,
        contract_handler: &'a dyn ContractValueHandler,
        uuid_handler: &'a dyn UUIDHandler,
        base_activation_handler: &'a dyn BaseActivationHandler,
        observer: &'a mut dyn Observer,
    ) -> Interpreter<'a> {
        let globals = base_activation_handler.base_activation(&location);
        Interpreter {
            registry,
            import_handler,
            contract_handler,
            uuid_handler,
            base_activation_handler,
            observer,
            location,
            globals,
            sub_globals: RefCell::new(HashMap::new()),
            before_snapshots: RefCell::new(None),
        }
    }

    /// Evaluates every top-level declaration of `program` into
    /// `self.globals`, tolerating forward references between
    /// top-level function and variable declarations (§4.2.1).
    pub fn run_program(&mut self, program: &Program) -> Result<()> {
        trace!(location = %self.location, "running program");
        for declaration in &program.declarations {
            if let Declaration::Function(decl) = declaration {
                self.define_function(decl);
            }
        }
        for declaration in &program.declarations {
            match declaration {
                Declaration::Function(_) => {}
                Declaration::Variable { name, value, .. } => {
                    let v = self.eval_expression(&self.globals.clone(), value)?;
                    self.globals.define(name, v);
                }
                Declaration::Composite(_) | Declaration::Enum(_) => {}
                Declaration::Import(import) => self.run_import(import)?,
            }
        }
        Ok(())
    }

    fn define_function(&mut self, decl: &FunctionDecl) {
        let signature = crate::static_type::StaticType::Function {
            parameters: decl.parameters.iter().map(|p| p.declared_type.clone()).collect(),
            return_type: Rc::new(decl.return_type.clone()),
        };
        let function = FunctionValue {
            signature,
            repr: FunctionRepr::Interpreter {
                decl: Rc::new(decl.clone()),
                closure: Rc::clone(&self.globals),
                location: self.location.clone(),
            },
        };
        self.globals.define(&decl.name, Value::Function(function));
    }

    /// The single entry point an embedder calls to run a transaction
    /// or script (§6.2): load `program`'s declarations, then invoke
    /// `entry_point` with `arguments`.
    pub fn invoke(&mut self, program: &Program, entry_point: &str, arguments: Vec<Value>) -> Result<Value> {
        self.run_program(program)?;
        let function = self
            .globals
            .get(entry_point, self.registry)
            .map_err(|_| InterpreterError::UndefinedIdentifier(entry_point.to_string()))?;
        match function {
            Value::Function(f) => self.call_function(&f, arguments),
            _ => Err(InterpreterError::NotCallable),
        }
    }

    pub(crate) fn sub_interpreter_globals(&self, location: &Location) -> Option<Rc<Activation>> {
        self.sub_globals.borrow().get(location).cloned()
    }

    pub(crate) fn cache_sub_interpreter_globals(&self, location: Location, globals: Rc<Activation>) {
        self.sub_globals.borrow_mut().insert(location, globals);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use num_bigint::BigInt;

    use super::*;
    use crate::ast::{BinaryOp, Expression, FunctionDecl, Node, Statement};
    use crate::elaboration::{Conditions, TypeDef};
    use crate::host::testing::TestHost;
    use crate::host::NullObserver;
    use crate::numeric::{Numeric, NumericKind};
    use crate::static_type::{CompositeKind, StaticType};

    fn int_literal(v: i64) -> Node<Expression> {
        Rc::new(Expression::IntegerLiteral { value: BigInt::from(v), kind: NumericKind::Int })
    }

    fn run(registry: &TypeRegistry, host: &TestHost, program: &Program, entry_point: &str, args: Vec<Value>) -> Result<Value> {
        let mut observer = NullObserver;
        let mut interpreter = Interpreter::new(Location::Test, registry, host, host, host, host, &mut observer);
        interpreter.invoke(program, entry_point, args)
    }

    /// S2: `let names: [AnyStruct] = ["foo","bar"] as [String];
    /// names.append(5)` rejects the element of the wrong concrete
    /// type rather than silently storing it — the array keeps
    /// tracking its real `[String]` element type even though the
    /// binding widened it to `[AnyStruct]`.
    #[test]
    fn container_mutation_rejects_a_type_mismatched_element() {
        let registry = TypeRegistry::new();
        let host = TestHost::new();

        let names_decl = Statement::VariableDecl {
            name: "names".to_string(),
            is_const: true,
            declared_type: Some(StaticType::variable_array(StaticType::AnyStruct)),
            value: Rc::new(Expression::Cast {
                expression: Rc::new(Expression::ArrayLiteral(vec![
                    Rc::new(Expression::StringLiteral("foo".to_string())),
                    Rc::new(Expression::StringLiteral("bar".to_string())),
                ])),
                kind: crate::ast::CastKind::StaticSimple,
                target: StaticType::variable_array(StaticType::String),
            }),
        };
        let bad_append = Statement::Expression(Rc::new(Expression::Invocation {
            function: Rc::new(Expression::MemberAccess(Rc::new(Expression::Identifier("names".to_string())), "append".to_string())),
            arguments: vec![int_literal(5)],
        }));
        let main = FunctionDecl {
            name: "main".to_string(),
            parameters: vec![],
            return_type: StaticType::Void,
            body: Some(vec![Rc::new(names_decl), Rc::new(bad_append), Rc::new(Statement::Return(None))]),
            pre_conditions: vec![],
            post_conditions: vec![],
        };
        let program = Program { declarations: vec![Declaration::Function(main)] };

        let err = run(&registry, &host, &program, "main", vec![]).unwrap_err();
        assert!(matches!(err, InterpreterError::Value(crate::errors::ValueError::ContainerMutation { .. })));
    }

    /// S3: `let xs: {UInt32: String}? = nil; let ys = xs ?? {}` binds
    /// `ys` to a dictionary that still accepts a `{UInt32: String}`
    /// insert, even though the `{}` literal itself was built with no
    /// entries to infer a key/value type from.
    #[test]
    fn nil_coalesced_empty_dictionary_accepts_the_declared_entry_type() {
        let registry = TypeRegistry::new();
        let host = TestHost::new();

        let dict_type = StaticType::dictionary(StaticType::Numeric(NumericKind::UInt32), StaticType::String);
        let xs_decl = Statement::VariableDecl {
            name: "xs".to_string(),
            is_const: true,
            declared_type: Some(StaticType::optional(dict_type.clone())),
            value: Rc::new(Expression::NilLiteral),
        };
        let ys_decl = Statement::VariableDecl {
            name: "ys".to_string(),
            is_const: true,
            declared_type: Some(dict_type),
            value: Rc::new(Expression::NilCoalescing(
                Rc::new(Expression::Identifier("xs".to_string())),
                Rc::new(Expression::DictionaryLiteral(vec![])),
            )),
        };
        let insert = Statement::Assignment {
            target: Rc::new(Expression::Index(
                Rc::new(Expression::Identifier("ys".to_string())),
                Rc::new(Expression::IntegerLiteral { value: BigInt::from(0), kind: NumericKind::UInt32 }),
            )),
            value: Rc::new(Expression::StringLiteral("test".to_string())),
        };
        let ret = Statement::Return(Some(Rc::new(Expression::Index(
            Rc::new(Expression::Identifier("ys".to_string())),
            Rc::new(Expression::IntegerLiteral { value: BigInt::from(0), kind: NumericKind::UInt32 }),
        ))));
        let main = FunctionDecl {
            name: "main".to_string(),
            parameters: vec![],
            return_type: StaticType::optional(StaticType::String),
            body: Some(vec![Rc::new(xs_decl), Rc::new(ys_decl), Rc::new(insert), Rc::new(ret)]),
            pre_conditions: vec![],
            post_conditions: vec![],
        };
        let program = Program { declarations: vec![Declaration::Function(main)] };

        let result = run(&registry, &host, &program, "main", vec![]).unwrap();
        match result {
            Value::Some(inner) => assert_eq!(*inner, Value::string("test")),
            other => panic!("expected Some(\"test\"), got {:?}", other),
        }
    }

    /// S5: a diamond conformance graph (`A: B`, `B: C, D`, `C: E, F`,
    /// `D: F`) runs every ancestor's precondition for `test()` exactly
    /// once, in linearized pre-order.
    #[test]
    fn diamond_conformance_runs_preconditions_in_linearized_order() {
        let mut registry = TypeRegistry::new();
        let ids: HashMap<&str, crate::location::TypeID> =
            ["A", "B", "C", "D", "E", "F"].iter().map(|n| (*n, crate::location::TypeID(format!("T.test.{}", n)))).collect();

        let record_condition = |name: &str| crate::ast::Condition {
            expression: Rc::new(Expression::Invocation {
                function: Rc::new(Expression::Identifier("record".to_string())),
                arguments: vec![Rc::new(Expression::StringLiteral(name.to_string()))],
            }),
            message: None,
        };

        for (name, conformances, kind) in [
            ("A", vec!["B"], CompositeKind::Struct),
            ("B", vec!["C", "D"], CompositeKind::StructInterface),
            ("C", vec!["E", "F"], CompositeKind::StructInterface),
            ("D", vec!["F"], CompositeKind::StructInterface),
            ("E", vec![], CompositeKind::StructInterface),
            ("F", vec![], CompositeKind::StructInterface),
        ] {
            let mut def = TypeDef::new(ids[name].clone(), kind);
            def.conformances = conformances.into_iter().map(|c| ids[c].clone()).collect();
            def.conditions.insert("test".to_string(), Conditions { pre: vec![record_condition(name)], post: vec![] });
            if name == "A" {
                def.functions.insert(
                    "test".to_string(),
                    FunctionDecl {
                        name: "test".to_string(),
                        parameters: vec![],
                        return_type: StaticType::Void,
                        body: Some(vec![]),
                        pre_conditions: vec![],
                        post_conditions: vec![],
                    },
                );
            }
            registry.register(def);
        }
        registry.freeze(&ids["A"]);

        let host = TestHost::new();
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let log_for_host = Rc::clone(&log);
        let record = FunctionValue::host(
            StaticType::Function { parameters: vec![StaticType::String], return_type: Rc::new(StaticType::Bool) },
            move |args| {
                if let Value::String(s) = &args[0] {
                    log_for_host.borrow_mut().push(s.to_string());
                }
                Ok(Value::Bool(true))
            },
        );

        let body = vec![
            Rc::new(Statement::VariableDecl {
                name: "a".to_string(),
                is_const: true,
                declared_type: None,
                value: Rc::new(Expression::Create { type_id: ids["A"].clone(), arguments: vec![] }),
            }),
            Rc::new(Statement::Expression(Rc::new(Expression::Invocation {
                function: Rc::new(Expression::MemberAccess(Rc::new(Expression::Identifier("a".to_string())), "test".to_string())),
                arguments: vec![],
            }))),
        ];
        let main = FunctionDecl {
            name: "main".to_string(),
            parameters: vec![],
            return_type: StaticType::Void,
            body: Some(body),
            pre_conditions: vec![],
            post_conditions: vec![],
        };
        let program = Program { declarations: vec![Declaration::Function(main)] };

        let mut observer = NullObserver;
        let mut interpreter = Interpreter::new(Location::Test, &registry, &host, &host, &host, &host, &mut observer);
        interpreter.globals.define("record", Value::Function(record));
        interpreter.invoke(&program, "main", vec![]).unwrap();

        assert_eq!(*log.borrow(), vec!["B", "C", "E", "F", "D", "A"]);
    }

    /// S6: `import a, b from 0x1` evaluates each contract-name location
    /// as its own sub-interpreter exactly once and binds the exported
    /// function into the importing program's globals.
    #[test]
    fn import_from_two_locations_binds_both_functions() {
        let addr = crate::location::Address::from_u64(1);
        let loc_a = Location::Address { address: addr, name: "a".to_string() };
        let loc_b = Location::Address { address: addr, name: "b".to_string() };

        let mut host = TestHost::new();
        let fn_decl = |name: &str, v: i64| FunctionDecl {
            name: name.to_string(),
            parameters: vec![],
            return_type: StaticType::Numeric(NumericKind::Int),
            body: Some(vec![Rc::new(Statement::Return(Some(int_literal(v))))]),
            pre_conditions: vec![],
            post_conditions: vec![],
        };
        host.register_program(loc_a.clone(), Program { declarations: vec![Declaration::Function(fn_decl("a", 1))] });
        host.register_program(loc_b.clone(), Program { declarations: vec![Declaration::Function(fn_decl("b", 2))] });

        let main = FunctionDecl {
            name: "main".to_string(),
            parameters: vec![],
            return_type: StaticType::Numeric(NumericKind::Int),
            body: Some(vec![Rc::new(Statement::Return(Some(Rc::new(Expression::Binary(
                BinaryOp::Add,
                Rc::new(Expression::Invocation { function: Rc::new(Expression::Identifier("a".to_string())), arguments: vec![] }),
                Rc::new(Expression::Invocation { function: Rc::new(Expression::Identifier("b".to_string())), arguments: vec![] }),
            )))))]),
            pre_conditions: vec![],
            post_conditions: vec![],
        };
        let program = Program {
            declarations: vec![
                Declaration::Import(crate::ast::ImportDecl { location: loc_a, names: None }),
                Declaration::Import(crate::ast::ImportDecl { location: loc_b, names: None }),
                Declaration::Function(main),
            ],
        };

        let registry = TypeRegistry::new();
        let result = run(&registry, &host, &program, "main", vec![]).unwrap();
        assert_eq!(result, Value::Numeric(Numeric::from_i64(NumericKind::Int, 3).unwrap()));
    }
}
