//! 继承关系解析与类级别检查

use crate::ast::*;
use super::analyzer::SemanticAnalyzer;
use super::{ClassInfo, DeclRef, Diagnostic, LookingFor, ScopeId, SymbolKind, VirtualFunction};

impl<'a> SemanticAnalyzer<'a> {
    /// 第二遍：链接父类作用域，收集接口义务
    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) fn resolve_hierarchy(&mut self, program: &'a Program) -> bool {
        let mut ok = true;
        for class in program.classes() {
            ok &= self.inherit(class);
        }
        ok
    }

    fn class_scope(&self, class: &ClassDecl) -> Option<ScopeId> {
        self.model.scope_of(class.id)
    }

    fn inherit(&mut self, class: &'a ClassDecl) -> bool {
        let Some(scope) = self.class_scope(class) else {
            return true;
        };
        let mut ok = true;
        let mut info = ClassInfo::default();

        if let Some(extends) = &class.extends {
            let global = self.model.table.global();
            let parent = match self.model.table.lookup(global, &extends.name, Some(SymbolKind::Class)) {
                Some(symbol) => match symbol.decl {
                    DeclRef::Class(parent) => Some(parent),
                    _ => None,
                },
                // 未找到的父类在第三遍报告
                None => None,
            };

            if let Some(parent) = parent {
                let parent_scope = self.class_scope(parent);
                let cyclic = parent.id == class.id
                    || parent_scope.is_some_and(|ps| self.model.table.super_chain_reaches(ps, scope));

                if cyclic {
                    self.report(Diagnostic::CyclicInheritance {
                        class: class.name().to_string(),
                        loc: extends.loc,
                    });
                    ok = false;
                } else if let Some(parent_scope) = parent_scope {
                    tracing::debug!(class = class.name(), parent = parent.name(), "linked super scope");
                    self.model.table.set_super(scope, parent_scope);
                    info.parent = Some(parent);
                }
            }
        }

        for interface_name in &class.implements {
            let Some(interface) = self.model.find_interface(&interface_name.name) else {
                continue;
            };

            for prototype in &interface.members {
                let existing = info
                    .obligations
                    .iter()
                    .find(|vf| vf.prototype.name() == prototype.name())
                    .map(|vf| vf.prototype);

                match existing {
                    Some(required) => {
                        if !required.type_equal(prototype) {
                            self.report(Diagnostic::OverrideMismatch {
                                name: prototype.name().to_string(),
                                loc: prototype.ident.loc,
                            });
                            ok = false;
                        }
                    }
                    None => info.obligations.push(VirtualFunction {
                        prototype,
                        interface: interface_name,
                        implemented: false,
                    }),
                }
            }
        }

        self.model.classes.insert(class.id, info);
        ok
    }

    /// 第三遍：逐个声明做类型与覆盖检查
    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) fn check_program(&mut self, program: &'a Program) -> bool {
        let mut ok = true;
        for decl in &program.decls {
            ok &= match decl {
                Decl::Var(var) => self.check_var_decl(var),
                Decl::Fn(function) => self.check_function(function),
                Decl::Class(class) => self.check_class(class),
                Decl::Interface(interface) => self.check_interface(interface),
            };
        }
        ok
    }

    fn check_class(&mut self, class: &'a ClassDecl) -> bool {
        let Some(scope) = self.class_scope(class) else {
            return true;
        };
        let global = self.model.table.global();
        let mut ok = true;

        // 父类必须存在
        if let Some(extends) = &class.extends {
            if self.model.table.lookup(global, &extends.name, Some(SymbolKind::Class)).is_none() {
                self.report(Diagnostic::IdentifierNotDeclared {
                    name: extends.name.clone(),
                    loc: extends.loc,
                    looking_for: LookingFor::Class,
                });
                ok = false;
            }
        }

        // 覆盖的方法必须签名一致；字段不能与继承的名字重复
        for member in &class.members {
            match member {
                ClassMember::Method(method) => {
                    let inherited = self
                        .model
                        .table
                        .lookup_super(scope, method.name(), Some(SymbolKind::Function))
                        .map(|symbol| symbol.decl);
                    if let Some(DeclRef::Fn(inherited)) = inherited {
                        if !method.type_equal(inherited) {
                            self.report(Diagnostic::OverrideMismatch {
                                name: method.name().to_string(),
                                loc: method.ident.loc,
                            });
                            ok = false;
                        }
                    }
                }
                ClassMember::Field(field) => {
                    let inherited = self
                        .model
                        .table
                        .lookup_super(scope, field.name(), None)
                        .map(|symbol| symbol.decl);
                    if let Some(existing) = inherited {
                        self.report(Diagnostic::DeclConflict {
                            name: field.name().to_string(),
                            loc: field.ident.loc,
                            existing: existing.loc(),
                        });
                        ok = false;
                    }
                }
            }
        }

        // 实现的接口必须存在
        for interface_name in &class.implements {
            if self.model.table.lookup(global, &interface_name.name, Some(SymbolKind::Interface)).is_none() {
                self.report(Diagnostic::IdentifierNotDeclared {
                    name: interface_name.name.clone(),
                    loc: interface_name.loc,
                    looking_for: LookingFor::Interface,
                });
                ok = false;
            }
        }

        ok &= self.check_obligations(class, scope);

        for member in &class.members {
            ok &= match member {
                ClassMember::Field(field) => self.check_var_decl(field),
                ClassMember::Method(method) => self.check_function(method),
            };
        }

        ok
    }

    /// 每个接口义务只在类自身中查找；每个不完整的接口只报告一次
    fn check_obligations(&mut self, class: &'a ClassDecl, scope: ScopeId) -> bool {
        let obligations = match self.model.classes.get(&class.id) {
            Some(info) => info.obligations.clone(),
            None => return true,
        };

        let mut incomplete: Vec<&'a Identifier> = Vec::new();
        let mut implemented = Vec::with_capacity(obligations.len());

        for obligation in &obligations {
            let found = self
                .model
                .table
                .lookup_in_class(scope, obligation.prototype.name(), Some(SymbolKind::Function))
                .map(|symbol| symbol.decl);

            let satisfied = match found {
                Some(DeclRef::Fn(method)) if method.type_equal(obligation.prototype) => true,
                Some(DeclRef::Fn(method)) => {
                    self.report(Diagnostic::OverrideMismatch {
                        name: method.name().to_string(),
                        loc: method.ident.loc,
                    });
                    false
                }
                _ => false,
            };

            if !satisfied && !incomplete.iter().any(|i| i.name == obligation.interface.name) {
                incomplete.push(obligation.interface);
            }
            implemented.push(satisfied);
        }

        if let Some(info) = self.model.classes.get_mut(&class.id) {
            for (obligation, satisfied) in info.obligations.iter_mut().zip(implemented) {
                obligation.implemented = satisfied;
            }
        }

        for interface in &incomplete {
            self.report(Diagnostic::InterfaceNotImplemented {
                class: class.name().to_string(),
                interface: interface.name.clone(),
                loc: interface.loc,
            });
        }

        incomplete.is_empty()
    }

    /// 接口只检查原型中出现的类型
    fn check_interface(&mut self, interface: &'a InterfaceDecl) -> bool {
        let mut ok = true;
        for prototype in &interface.members {
            ok &= self.check_signature(prototype);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::semantic::{Diagnostic, check};
    use pretty_assertions::assert_eq;

    fn diagnostics_for(source: &str) -> Vec<Diagnostic> {
        let program = parse(lex(source).unwrap()).unwrap();
        check(&program).diagnostics.into_iter().collect()
    }

    #[test]
    fn test_unknown_parent_and_interface() {
        let diagnostics = diagnostics_for("class A extends Missing implements Nope { }");
        let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "*** No declaration found for class 'Missing'".to_string(),
                "*** No declaration found for interface 'Nope'".to_string(),
            ]
        );
    }

    #[test]
    fn test_cyclic_inheritance_is_reported_once() {
        let diagnostics = diagnostics_for(
            "class A extends B { int f() { return 1; } }\n\
             class B extends A { int g() { return f(); } }\n\
             class C extends C { }",
        );
        let cycles: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::CyclicInheritance { class, .. } => Some(class.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(cycles, vec!["B", "C"]);
    }

    #[test]
    fn test_interfaces_disagreeing_on_a_method() {
        let diagnostics = diagnostics_for(
            "interface I { int f(); }\n\
             interface J { bool f(); }\n\
             class C implements I, J { int f() { return 0; } }",
        );
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::OverrideMismatch { name, loc } if name == "f" && loc.line == 2
        )));
    }

    #[test]
    fn test_inherited_field_name_conflicts() {
        let diagnostics = diagnostics_for("class A { int x; } class B extends A { bool x; }");
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(&diagnostics[0], Diagnostic::DeclConflict { name, .. } if name == "x"));
    }

    #[test]
    fn test_inherited_implementation_does_not_satisfy_interface() {
        let diagnostics = diagnostics_for(
            "interface I { void f(); }\n\
             class A { void f() { } }\n\
             class B extends A implements I { }",
        );
        assert!(matches!(
            diagnostics.as_slice(),
            [Diagnostic::InterfaceNotImplemented { class, interface, .. }] if class == "B" && interface == "I"
        ));
    }
}
