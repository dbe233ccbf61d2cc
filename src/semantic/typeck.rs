//! 成员、语句与表达式的类型检查

use crate::ast::*;
use crate::error::SourceLocation;
use crate::types::Type;
use super::analyzer::SemanticAnalyzer;
use super::{CallTarget, DeclRef, Diagnostic, LookingFor, ScopeId, SymbolKind, VarRef};

impl<'a> SemanticAnalyzer<'a> {
    /// 类型名必须是已声明的类或接口；未解析的类型报告一次
    fn check_type_ref(&mut self, ty: &TypeRef) -> bool {
        let Some(name) = ty.ty.base_name() else {
            return true;
        };
        if self.is_type_name(name) {
            return true;
        }
        self.report(Diagnostic::IdentifierNotDeclared {
            name: name.to_string(),
            loc: ty.loc,
            looking_for: LookingFor::Type,
        });
        false
    }

    fn is_type_name(&self, name: &str) -> bool {
        self.model.find_class(name).is_some() || self.model.find_interface(name).is_some()
    }

    /// 声明中的类型；无法解析时为错误类型
    fn declared_type(&self, ty: &TypeRef) -> Type {
        match ty.ty.base_name() {
            Some(name) if !self.is_type_name(name) => Type::Error,
            _ => ty.ty.clone(),
        }
    }

    pub(super) fn check_var_decl(&mut self, var: &VarDecl) -> bool {
        self.check_type_ref(&var.ty)
    }

    pub(super) fn check_signature(&mut self, function: &FnDecl) -> bool {
        let mut ok = self.check_type_ref(&function.return_type);
        for formal in &function.formals {
            ok &= self.check_var_decl(formal);
        }
        ok
    }

    pub(super) fn check_function(&mut self, function: &'a FnDecl) -> bool {
        let mut ok = self.check_signature(function);

        if let (Some(body), Some(scope)) = (&function.body, self.model.scope_of(function.id)) {
            let errors_before = self.diagnostics.len();
            let saved_function = self.current_function.replace(function);
            let saved_depth = std::mem::replace(&mut self.loop_depth, 0);

            self.check_block(scope, body);

            self.current_function = saved_function;
            self.loop_depth = saved_depth;
            ok &= self.diagnostics.len() == errors_before;
        }

        ok
    }

    fn check_block(&mut self, scope: ScopeId, block: &'a Block) {
        for var in &block.decls {
            self.check_var_decl(var);
        }
        for stmt in &block.statements {
            self.check_stmt(scope, stmt);
        }
    }

    fn check_test(&mut self, scope: ScopeId, condition: &'a Expr) {
        let ty = self.check_expr(scope, condition);
        if !ty.is_error() && ty != Type::Bool {
            self.report(Diagnostic::TestNotBoolean { loc: condition.loc });
        }
    }

    fn check_stmt(&mut self, scope: ScopeId, stmt: &'a Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(scope, expr);
            }
            Stmt::Empty => {}
            Stmt::Block(block) => {
                let block_scope = self.model.scope_of(block.id).unwrap_or(scope);
                self.check_block(block_scope, block);
            }
            Stmt::If(if_stmt) => {
                self.check_test(scope, &if_stmt.condition);
                self.check_stmt(scope, &if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.check_stmt(scope, else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.check_test(scope, &while_stmt.condition);
                self.loop_depth += 1;
                self.check_stmt(scope, &while_stmt.body);
                self.loop_depth -= 1;
            }
            Stmt::For(for_stmt) => {
                if let Some(init) = &for_stmt.init {
                    self.check_expr(scope, init);
                }
                self.check_test(scope, &for_stmt.condition);
                if let Some(update) = &for_stmt.update {
                    self.check_expr(scope, update);
                }
                self.loop_depth += 1;
                self.check_stmt(scope, &for_stmt.body);
                self.loop_depth -= 1;
            }
            Stmt::Break(loc) => {
                if self.loop_depth == 0 {
                    self.report(Diagnostic::BreakOutsideLoop { loc: *loc });
                }
            }
            Stmt::Return(ret) => self.check_return(scope, ret),
            Stmt::Print(print) => {
                for (i, arg) in print.args.iter().enumerate() {
                    let ty = self.check_expr(scope, arg);
                    if !matches!(ty, Type::Int | Type::Bool | Type::String | Type::Error) {
                        self.report(Diagnostic::PrintArgMismatch {
                            index: i + 1,
                            given: ty,
                            loc: arg.loc,
                        });
                    }
                }
            }
        }
    }

    fn check_return(&mut self, scope: ScopeId, ret: &'a ReturnStmt) {
        let expected = match self.current_function {
            Some(function) => self.declared_type(&function.return_type),
            None => return,
        };

        let given = match &ret.value {
            Some(value) => self.check_expr(scope, value),
            None => Type::Void,
        };

        let compatible = if expected == Type::Void || given == Type::Void {
            expected == given || expected.is_error()
        } else {
            self.is_compatible(&given, &expected)
        };

        if !compatible {
            let loc = ret.value.as_ref().map_or(ret.loc, |v| v.loc);
            self.report(Diagnostic::ReturnMismatch { given, expected, loc });
        }
    }

    /// `from` 的值能否赋给 `to` 类型的变量
    pub(super) fn is_compatible(&self, from: &Type, to: &Type) -> bool {
        if from.is_equivalent_to(to) {
            return true;
        }

        match (from, to) {
            (Type::Null, Type::Named(_)) => true,
            (Type::Named(sub), Type::Named(target)) => {
                let mut current = self.model.find_class(sub);
                let mut steps = 0;
                while let Some(class) = current {
                    if class.name() == target || class.implements_interface(target) {
                        return true;
                    }
                    steps += 1;
                    if steps > self.model.table.scope_count() {
                        break;
                    }
                    current = self.model.class_info(class.id).and_then(|info| info.parent);
                }
                false
            }
            _ => false,
        }
    }

    /// 当前所在类的类型
    fn current_class_type(&self, scope: ScopeId) -> Option<Type> {
        let class_scope = self.model.table.scope(scope).this_scope?;
        let owner = self.model.table.scope(class_scope).owner?;
        Some(Type::Named(owner.name().to_string()))
    }

    pub(super) fn check_expr(&mut self, scope: ScopeId, expr: &'a Expr) -> Type {
        let ty = self.infer_expr(scope, expr);
        self.model.expr_types.insert(expr.id, ty.clone());
        ty
    }

    fn infer_expr(&mut self, scope: ScopeId, expr: &'a Expr) -> Type {
        match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                LiteralValue::Int(_) => Type::Int,
                LiteralValue::Double(_) => Type::Double,
                LiteralValue::Bool(_) => Type::Bool,
                LiteralValue::String(_) => Type::String,
                LiteralValue::Null => Type::Null,
            },
            ExprKind::This => match self.current_class_type(scope) {
                Some(ty) => ty,
                None => {
                    self.report(Diagnostic::ThisOutsideClassScope { loc: expr.loc });
                    Type::Error
                }
            },
            ExprKind::Binary(binary) => self.check_binary(scope, binary, expr.loc),
            ExprKind::Unary(unary) => {
                let operand = self.check_expr(scope, &unary.operand);
                let valid = match unary.op {
                    UnaryOp::Neg => operand.is_numeric(),
                    UnaryOp::Not => operand == Type::Bool,
                };
                if operand.is_error() {
                    return Type::Error;
                }
                if !valid {
                    self.report(Diagnostic::IncompatibleOperand {
                        op: unary.op.symbol().to_string(),
                        operand,
                        loc: expr.loc,
                    });
                    return Type::Error;
                }
                operand
            }
            ExprKind::Postfix(postfix) => {
                let operand = self.check_expr(scope, &postfix.operand);
                if operand.is_error() {
                    return Type::Error;
                }
                if operand != Type::Int {
                    self.report(Diagnostic::IncompatibleOperand {
                        op: postfix.op.symbol().to_string(),
                        operand,
                        loc: expr.loc,
                    });
                    return Type::Error;
                }
                Type::Int
            }
            ExprKind::Assignment(assign) => {
                let target = self.check_expr(scope, &assign.target);
                let value = self.check_expr(scope, &assign.value);
                if !self.is_compatible(&value, &target) {
                    self.report(Diagnostic::IncompatibleOperands {
                        op: "=".to_string(),
                        lhs: target,
                        rhs: value,
                        loc: expr.loc,
                    });
                    return Type::Error;
                }
                target
            }
            ExprKind::FieldAccess(access) => self.check_field_access(scope, expr, access),
            ExprKind::ArrayAccess(access) => {
                let base = self.check_expr(scope, &access.base);
                let subscript = self.check_expr(scope, &access.subscript);
                if !subscript.is_error() && subscript != Type::Int {
                    self.report(Diagnostic::SubscriptNotInteger { loc: access.subscript.loc });
                }
                match base {
                    Type::Array(elem) => *elem,
                    Type::Error => Type::Error,
                    _ => {
                        self.report(Diagnostic::BracketsOnNonArray { loc: access.base.loc });
                        Type::Error
                    }
                }
            }
            ExprKind::Call(call) => self.check_call(scope, expr, call),
            ExprKind::New(class) => {
                if self.model.find_class(&class.name).is_some() {
                    Type::Named(class.name.clone())
                } else {
                    self.report(Diagnostic::IdentifierNotDeclared {
                        name: class.name.clone(),
                        loc: class.loc,
                        looking_for: LookingFor::Class,
                    });
                    Type::Error
                }
            }
            ExprKind::NewArray(new_array) => {
                let size = self.check_expr(scope, &new_array.size);
                if !size.is_error() && size != Type::Int {
                    self.report(Diagnostic::NewArraySizeNotInteger { loc: new_array.size.loc });
                }
                if self.check_type_ref(&new_array.elem_type) {
                    Type::Array(Box::new(new_array.elem_type.ty.clone()))
                } else {
                    Type::Error
                }
            }
            ExprKind::ReadInteger => Type::Int,
            ExprKind::ReadLine => Type::String,
        }
    }

    fn check_binary(&mut self, scope: ScopeId, binary: &'a BinaryExpr, loc: SourceLocation) -> Type {
        let lhs = self.check_expr(scope, &binary.left);
        let rhs = self.check_expr(scope, &binary.right);
        let op = binary.op;

        let result = if op.is_arithmetic() {
            Type::Int
        } else {
            Type::Bool
        };

        if lhs.is_error() || rhs.is_error() {
            return if op.is_arithmetic() { Type::Error } else { result };
        }

        let valid = if op.is_arithmetic() || op.is_relational() {
            lhs.is_numeric() && lhs == rhs
        } else if op.is_equality() {
            lhs.is_equivalent_to(&rhs) || self.is_compatible(&lhs, &rhs) || self.is_compatible(&rhs, &lhs)
        } else {
            lhs == Type::Bool && rhs == Type::Bool
        };

        if !valid {
            self.report(Diagnostic::IncompatibleOperands {
                op: op.symbol().to_string(),
                lhs,
                rhs,
                loc,
            });
            return if op.is_arithmetic() { Type::Error } else { result };
        }

        if op.is_arithmetic() { lhs } else { result }
    }

    fn record_var(&mut self, expr: &Expr, decl: &'a VarDecl, declared_in: ScopeId) -> Type {
        self.model.var_refs.insert(expr.id, VarRef { decl, scope: declared_in });
        self.declared_type(&decl.ty)
    }

    fn check_field_access(&mut self, scope: ScopeId, expr: &'a Expr, access: &'a FieldAccessExpr) -> Type {
        let name = &access.field.name;

        let Some(base) = &access.base else {
            let found = self
                .model
                .table
                .resolve(scope, name, Some(SymbolKind::Variable))
                .map(|(declared_in, symbol)| (declared_in, symbol.decl));
            return match found {
                Some((declared_in, DeclRef::Var(decl))) => self.record_var(expr, decl, declared_in),
                _ => {
                    self.report(Diagnostic::IdentifierNotDeclared {
                        name: name.clone(),
                        loc: access.field.loc,
                        looking_for: LookingFor::Variable,
                    });
                    Type::Error
                }
            };
        };

        let base_ty = self.check_expr(scope, base);
        if base_ty.is_error() {
            return Type::Error;
        }

        let found = match &base_ty {
            Type::Named(class_name) => self
                .model
                .find_class(class_name)
                .and_then(|class| self.model.scope_of(class.id))
                .and_then(|class_scope| self.model.table.resolve_member(class_scope, name, Some(SymbolKind::Variable)))
                .map(|(declared_in, symbol)| (declared_in, symbol.decl)),
            _ => None,
        };

        let Some((declared_in, DeclRef::Var(decl))) = found else {
            self.report(Diagnostic::FieldNotFoundInBase {
                field: name.clone(),
                base: base_ty,
                loc: access.field.loc,
            });
            return Type::Error;
        };

        // 字段只能在兼容的类内部访问
        let accessible = self
            .current_class_type(scope)
            .is_some_and(|current| self.is_compatible(&current, &base_ty) || self.is_compatible(&base_ty, &current));
        if !accessible {
            self.report(Diagnostic::InaccessibleField {
                field: name.clone(),
                base: base_ty,
                loc: access.field.loc,
            });
            return Type::Error;
        }

        self.record_var(expr, decl, declared_in)
    }

    fn check_call(&mut self, scope: ScopeId, expr: &'a Expr, call: &'a CallExpr) -> Type {
        let name = &call.field.name;

        let target = match &call.base {
            None => {
                let found = self
                    .model
                    .table
                    .resolve(scope, name, Some(SymbolKind::Function))
                    .map(|(declared_in, symbol)| (declared_in, symbol.decl));
                match found {
                    Some((declared_in, DeclRef::Fn(method))) => {
                        let owner = self.model.table.scope(declared_in).owner;
                        match owner {
                            Some(DeclRef::Class(class)) => Some(CallTarget::Method { class, method }),
                            _ => Some(CallTarget::Function(method)),
                        }
                    }
                    _ => {
                        self.report(Diagnostic::IdentifierNotDeclared {
                            name: name.clone(),
                            loc: call.field.loc,
                            looking_for: LookingFor::Function,
                        });
                        None
                    }
                }
            }
            Some(base) => {
                let base_ty = self.check_expr(scope, base);
                match &base_ty {
                    Type::Error => None,
                    Type::Array(_) if name == "length" => Some(CallTarget::ArrayLength),
                    Type::Named(type_name) => {
                        let target = self.find_method(type_name, name);
                        if target.is_none() {
                            self.report(Diagnostic::FieldNotFoundInBase {
                                field: name.clone(),
                                base: base_ty.clone(),
                                loc: call.field.loc,
                            });
                        }
                        target
                    }
                    _ => {
                        self.report(Diagnostic::FieldNotFoundInBase {
                            field: name.clone(),
                            base: base_ty.clone(),
                            loc: call.field.loc,
                        });
                        None
                    }
                }
            }
        };

        let arg_types: Vec<Type> = call.args.iter().map(|arg| self.check_expr(scope, arg)).collect();

        let Some(target) = target else {
            return Type::Error;
        };
        self.model.call_targets.insert(expr.id, target);

        let callee = match target {
            CallTarget::ArrayLength => {
                if !call.args.is_empty() {
                    self.report(Diagnostic::NumArgsMismatch {
                        name: name.clone(),
                        expected: 0,
                        given: call.args.len(),
                        loc: call.field.loc,
                    });
                }
                return Type::Int;
            }
            CallTarget::Function(function) => function,
            CallTarget::Method { method, .. } | CallTarget::InterfaceMethod { method, .. } => method,
        };

        if callee.formals.len() != arg_types.len() {
            self.report(Diagnostic::NumArgsMismatch {
                name: name.clone(),
                expected: callee.formals.len(),
                given: arg_types.len(),
                loc: call.field.loc,
            });
        } else {
            for (i, ((arg, given), formal)) in call.args.iter().zip(arg_types).zip(&callee.formals).enumerate() {
                let expected = self.declared_type(&formal.ty);
                if !self.is_compatible(&given, &expected) {
                    self.report(Diagnostic::ArgMismatch {
                        index: i + 1,
                        given,
                        expected,
                        loc: arg.loc,
                    });
                }
            }
        }

        self.declared_type(&callee.return_type)
    }

    /// 在类（含父类链）或接口中查找方法
    fn find_method(&self, type_name: &str, method_name: &str) -> Option<CallTarget<'a>> {
        if let Some(class) = self.model.find_class(type_name) {
            let class_scope = self.model.scope_of(class.id)?;
            let (_, symbol) = self
                .model
                .table
                .resolve_member(class_scope, method_name, Some(SymbolKind::Function))?;
            return match symbol.decl {
                DeclRef::Fn(method) => Some(CallTarget::Method { class, method }),
                _ => None,
            };
        }

        let interface = self.model.find_interface(type_name)?;
        interface
            .members
            .iter()
            .find(|prototype| prototype.name() == method_name)
            .map(|method| CallTarget::InterfaceMethod { interface, method })
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::semantic::{Diagnostic, check};
    use pretty_assertions::assert_eq;

    fn messages(source: &str) -> Vec<String> {
        let program = parse(lex(source).unwrap()).unwrap();
        check(&program).diagnostics.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_well_typed_program_has_no_diagnostics() {
        let source = r#"
            interface Shape { int area(); }
            class Square implements Shape {
                int side;
                int area() { return side * side; }
                void grow(int by) { side = side + by; }
            }
            void main() {
                Shape s;
                Square q;
                int[] xs;
                int i;
                q = new Square;
                s = q;
                xs = NewArray(3, int);
                for (i = 0; i < xs.length(); i++) {
                    xs[i] = q.area();
                }
                while (true) { break; }
                if (s == null) Print("none"); else Print(s.area(), true);
            }
        "#;
        assert_eq!(messages(source), Vec::<String>::new());
    }

    #[test]
    fn test_expression_errors() {
        let source = r#"
            class A { int x; }
            void main() {
                A a;
                int i;
                bool b;
                i = b + 1;
                b = !i;
                i = a.x;
                i[0] = 1;
                i = a.missing;
                this.x = 2;
                Print(a);
                break;
                if (i) { }
                i = NewArray(b, int);
                foo();
            }
        "#;
        assert_eq!(
            messages(source),
            vec![
                "*** Incompatible operands: bool + int",
                "*** Incompatible operand: ! int",
                "*** A field 'x' only accessible within class scope",
                "*** [] can only be applied to arrays",
                "*** A has no such field 'missing'",
                "*** 'this' is only valid within class scope",
                "*** Incompatible argument 1: A given, int/bool/string expected",
                "*** break is only allowed inside a loop",
                "*** Test expression must have boolean type",
                "*** Size for NewArray must be an integer",
                "*** Incompatible operands: int = int[]",
                "*** No declaration found for function 'foo'",
            ]
        );
    }

    #[test]
    fn test_call_checks() {
        let source = r#"
            int f(int a, bool b) { return a; }
            void g() { return 1; }
            void main() {
                f(1);
                f(true, true);
                g();
            }
        "#;
        let program = parse(lex(source).unwrap()).unwrap();
        let diagnostics: Vec<Diagnostic> = check(&program).diagnostics.into_iter().collect();
        assert_eq!(diagnostics.len(), 3);
        assert!(matches!(&diagnostics[0], Diagnostic::ReturnMismatch { .. }));
        assert!(matches!(&diagnostics[1], Diagnostic::NumArgsMismatch { expected: 2, given: 1, .. }));
        assert!(matches!(&diagnostics[2], Diagnostic::ArgMismatch { index: 1, .. }));
    }

    #[test]
    fn test_subclass_assignable_to_parent_and_interface() {
        let source = r#"
            interface I { void f(); }
            class A implements I { void f() { } }
            class B extends A { int y; int get() { return y; } }
            void main() {
                A a;
                I i;
                B b;
                b = new B;
                a = b;
                i = b;
                b = a;
            }
        "#;
        assert_eq!(messages(source), vec!["*** Incompatible operands: B = A"]);
    }

    #[test]
    fn test_unknown_types_are_reported_and_absorbed() {
        let source = "void main() { Missing m; m = 3; m.go(); }";
        assert_eq!(messages(source), vec!["*** No declaration found for type 'Missing'"]);
    }
}
