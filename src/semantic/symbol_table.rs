//! 作用域与符号表
//!
//! 所有作用域保存在一个 arena 中，通过 [`ScopeId`] 互相引用：
//! `parent` 是词法外层，`super_scope` 只在类作用域上指向父类作用域，
//! `this_scope` 指向最近的类作用域（类作用域指向自身，子作用域继承）。

use std::collections::HashMap;
use std::fmt;

use crate::ast::*;
use crate::codegen::frame::Location;
use crate::error::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Block,
    Class,
    Interface,
    Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Class,
    Interface,
    Function,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Class => write!(f, "class"),
            SymbolKind::Interface => write!(f, "interface"),
            SymbolKind::Function => write!(f, "function"),
        }
    }
}

/// 对声明的非拥有引用
#[derive(Debug, Clone, Copy)]
pub enum DeclRef<'a> {
    Var(&'a VarDecl),
    Class(&'a ClassDecl),
    Interface(&'a InterfaceDecl),
    Fn(&'a FnDecl),
}

impl<'a> DeclRef<'a> {
    pub fn kind(&self) -> SymbolKind {
        match self {
            DeclRef::Var(_) => SymbolKind::Variable,
            DeclRef::Class(_) => SymbolKind::Class,
            DeclRef::Interface(_) => SymbolKind::Interface,
            DeclRef::Fn(_) => SymbolKind::Function,
        }
    }

    pub fn ident(&self) -> &'a Identifier {
        match self {
            DeclRef::Var(v) => &v.ident,
            DeclRef::Class(c) => &c.ident,
            DeclRef::Interface(i) => &i.ident,
            DeclRef::Fn(f) => &f.ident,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.ident().name
    }

    pub fn loc(&self) -> SourceLocation {
        self.ident().loc
    }

    pub fn id(&self) -> NodeId {
        match self {
            DeclRef::Var(v) => v.id,
            DeclRef::Class(c) => c.id,
            DeclRef::Interface(i) => i.id,
            DeclRef::Fn(f) => f.id,
        }
    }
}

impl<'a> From<&'a Decl> for DeclRef<'a> {
    fn from(decl: &'a Decl) -> Self {
        match decl {
            Decl::Var(v) => DeclRef::Var(v),
            Decl::Class(c) => DeclRef::Class(c),
            Decl::Interface(i) => DeclRef::Interface(i),
            Decl::Fn(f) => DeclRef::Fn(f),
        }
    }
}

impl<'a> From<&'a ClassMember> for DeclRef<'a> {
    fn from(member: &'a ClassMember) -> Self {
        match member {
            ClassMember::Method(m) => DeclRef::Fn(m),
            ClassMember::Field(f) => DeclRef::Var(f),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol<'a> {
    pub name: String,
    pub decl: DeclRef<'a>,
    /// 该声明打开的作用域（类、接口、函数）
    pub scope: Option<ScopeId>,
    /// 代码生成阶段分配的帧位置
    pub location: Option<Location>,
}

#[derive(Debug)]
pub struct Scope<'a> {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub super_scope: Option<ScopeId>,
    pub this_scope: Option<ScopeId>,
    pub owner: Option<DeclRef<'a>>,
    symbols: HashMap<String, Symbol<'a>>,
}

impl<'a> Scope<'a> {
    pub fn get(&self, name: &str) -> Option<&Symbol<'a>> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// 同一作用域中名字重复
#[derive(Debug, Clone, Copy)]
pub struct Conflict<'a> {
    pub existing: DeclRef<'a>,
}

fn kind_matches(symbol: &Symbol<'_>, kind: Option<SymbolKind>) -> bool {
    kind.is_none_or(|k| symbol.decl.kind() == k)
}

#[derive(Debug)]
pub struct SymbolTable<'a> {
    scopes: Vec<Scope<'a>>,
}

impl<'a> SymbolTable<'a> {
    /// 创建只含全局作用域的符号表
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Block,
                parent: None,
                super_scope: None,
                this_scope: None,
                owner: None,
                symbols: HashMap::new(),
            }],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope<'a> {
        &self.scopes[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// 在指定作用域中声明；重名时保留第一个声明
    pub fn declare_local(&mut self, scope: ScopeId, decl: DeclRef<'a>) -> Result<(), Conflict<'a>> {
        let symbols = &mut self.scopes[scope.index()].symbols;
        if let Some(existing) = symbols.get(decl.name()) {
            return Err(Conflict { existing: existing.decl });
        }

        symbols.insert(
            decl.name().to_string(),
            Symbol {
                name: decl.name().to_string(),
                decl,
                scope: None,
                location: None,
            },
        );
        Ok(())
    }

    /// 打开子作用域；若 `owner` 正是父作用域中登记的那个声明，则把符号链接到新作用域
    pub fn open_scope(&mut self, parent: ScopeId, owner: Option<DeclRef<'a>>, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let this_scope = if kind == ScopeKind::Class {
            Some(id)
        } else {
            self.scope(parent).this_scope
        };

        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            super_scope: None,
            this_scope,
            owner,
            symbols: HashMap::new(),
        });

        if let Some(owner) = owner {
            if let Some(symbol) = self.scopes[parent.index()].symbols.get_mut(owner.name()) {
                if symbol.decl.id() == owner.id() {
                    symbol.scope = Some(id);
                }
            }
        }

        id
    }

    /// 只查找给定作用域
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol<'a>> {
        self.scope(scope).get(name)
    }

    /// 沿词法链向外查找；种类不符的符号被跳过
    pub fn lookup(&self, scope: ScopeId, name: &str, kind: Option<SymbolKind>) -> Option<&Symbol<'a>> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(symbol) = scope.get(name).filter(|s| kind_matches(s, kind)) {
                return Some(symbol);
            }
            current = scope.parent;
        }
        None
    }

    /// 只查找最近的类作用域本身，不查父类
    pub fn lookup_in_class(&self, scope: ScopeId, name: &str, kind: Option<SymbolKind>) -> Option<&Symbol<'a>> {
        let class_scope = self.scope(scope).this_scope?;
        self.scope(class_scope).get(name).filter(|s| kind_matches(s, kind))
    }

    /// 从最近类作用域的 super 链接开始，只沿父类链查找
    pub fn lookup_super(&self, scope: ScopeId, name: &str, kind: Option<SymbolKind>) -> Option<&Symbol<'a>> {
        let class_scope = self.scope(scope).this_scope?;
        self.resolve_in_supers(self.scope(class_scope).super_scope, name, kind)
            .map(|(_, symbol)| symbol)
    }

    /// 表达式中的名字解析：沿词法链向外，遇到类作用域时连同其父类链一起查找
    pub fn resolve(&self, scope: ScopeId, name: &str, kind: Option<SymbolKind>) -> Option<(ScopeId, &Symbol<'a>)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(symbol) = scope.get(name).filter(|s| kind_matches(s, kind)) {
                return Some((id, symbol));
            }
            if scope.kind == ScopeKind::Class {
                if let Some(found) = self.resolve_in_supers(scope.super_scope, name, kind) {
                    return Some(found);
                }
            }
            current = scope.parent;
        }
        None
    }

    /// 在类作用域及其父类链中查找成员，返回声明所在的作用域
    pub fn resolve_member(&self, class_scope: ScopeId, name: &str, kind: Option<SymbolKind>) -> Option<(ScopeId, &Symbol<'a>)> {
        if let Some(symbol) = self.scope(class_scope).get(name).filter(|s| kind_matches(s, kind)) {
            return Some((class_scope, symbol));
        }
        self.resolve_in_supers(self.scope(class_scope).super_scope, name, kind)
    }

    fn resolve_in_supers(&self, start: Option<ScopeId>, name: &str, kind: Option<SymbolKind>) -> Option<(ScopeId, &Symbol<'a>)> {
        let mut current = start;
        let mut steps = 0;
        while let Some(id) = current {
            if steps > self.scopes.len() {
                break;
            }
            let scope = self.scope(id);
            if let Some(symbol) = scope.get(name).filter(|s| kind_matches(s, kind)) {
                return Some((id, symbol));
            }
            current = scope.super_scope;
            steps += 1;
        }
        None
    }

    pub fn set_super(&mut self, class_scope: ScopeId, super_scope: ScopeId) {
        self.scopes[class_scope.index()].super_scope = Some(super_scope);
    }

    /// `from` 自身或其父类链是否到达 `target`
    pub fn super_chain_reaches(&self, from: ScopeId, target: ScopeId) -> bool {
        let mut current = Some(from);
        let mut steps = 0;
        while let Some(id) = current {
            if id == target {
                return true;
            }
            if steps > self.scopes.len() {
                return true;
            }
            current = self.scope(id).super_scope;
            steps += 1;
        }
        false
    }

    /// 记录符号的帧位置
    pub fn set_location(&mut self, scope: ScopeId, name: &str, location: Location) -> bool {
        match self.scopes[scope.index()].symbols.get_mut(name) {
            Some(symbol) => {
                symbol.location = Some(location);
                true
            }
            None => false,
        }
    }
}

impl Default for SymbolTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}
