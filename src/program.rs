//! Class hierarchy and method declarations of the analysed program.
//!
//! A [`Program`] is an immutable snapshot produced by a [`ProgramBuilder`]. Classes,
//! method sub-signatures and fields are interned and referred to by small copyable
//! handles ([`ClassId`], [`SigId`], [`FieldId`]). Method bodies live in
//! [`Body`][crate::cfg::Body].

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

use crate::cfg::Body;
use crate::error::{Error, Result};

/// Name of instance constructors.
pub const CONSTRUCTOR: &str = "<init>";

/// Name of the root class.
pub const OBJECT: &str = "Object";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SigId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prim {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Prim::Boolean => "boolean",
            Prim::Byte => "byte",
            Prim::Char => "char",
            Prim::Short => "short",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Void,
    Prim(Prim),
    Ref(ClassId),
    Array(Box<Type>),
}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    /// Class references and arrays.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Ref(_) | Type::Array(_))
    }

    pub fn class(&self) -> Option<ClassId> {
        match self {
            Type::Ref(c) => Some(*c),
            _ => None,
        }
    }
}

/// Name, parameter types and return type of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubSignature {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
}

/// Reference to a method as it appears at a call site: the class it is looked up in
/// and its sub-signature. The method need not be declared in that class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub class: ClassId,
    pub sig: SigId,
    pub is_static: bool,
}

impl MethodRef {
    pub fn new(class: ClassId, sig: SigId, is_static: bool) -> Self {
        Self {
            class,
            sig,
            is_static,
        }
    }

    /// The same method looked up in another class.
    pub fn with_class(self, class: ClassId) -> Self {
        Self { class, ..self }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub class: ClassId,
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Application,
    Library,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub sig: SigId,
    pub is_static: bool,
    pub body: Option<Body>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub origin: Origin,
    pub methods: Vec<MethodDecl>,
    /// Classes this class stands in for when their methods have no body.
    pub replaces: Vec<ClassId>,
}

impl ClassDecl {
    pub fn is_application(&self) -> bool {
        self.origin == Origin::Application
    }

    pub fn method(&self, sig: SigId) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.sig == sig)
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    classes: Vec<ClassDecl>,
    sigs: Vec<SubSignature>,
    sig_index: HashMap<SubSignature, SigId>,
    fields: Vec<FieldDecl>,
    by_name: HashMap<String, ClassId>,
}

impl Program {
    pub fn object(&self) -> ClassId {
        ClassId(0)
    }

    pub fn class(&self, id: ClassId) -> &ClassDecl {
        &self.classes[id.index()]
    }

    pub fn class_named(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len() as u32).map(ClassId)
    }

    pub fn sig(&self, id: SigId) -> &SubSignature {
        &self.sigs[id.0 as usize]
    }

    pub fn find_sig(&self, sig: &SubSignature) -> Option<SigId> {
        self.sig_index.get(sig).copied()
    }

    pub fn field(&self, id: FieldId) -> &FieldDecl {
        &self.fields[id.0 as usize]
    }

    pub fn method_name(&self, m: MethodRef) -> &str {
        &self.sig(m.sig).name
    }

    pub fn is_constructor(&self, m: MethodRef) -> bool {
        self.method_name(m) == CONSTRUCTOR
    }

    pub fn declares_method(&self, class: ClassId, sig: SigId) -> bool {
        self.class(class).method(sig).is_some()
    }

    /// Body of the method declared with this exact class and signature, if any.
    pub fn body(&self, m: MethodRef) -> Option<&Body> {
        self.class(m.class).method(m.sig)?.body.as_ref()
    }

    /// Reflexive subclass test along the superclass chain.
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut current = Some(sub);
        while let Some(c) = current {
            if c == sup {
                return true;
            }
            current = self.class(c).superclass;
        }
        false
    }

    /// Returns true if a value of class `sub` can be stored in a variable of type `sup`.
    pub fn can_store(&self, sub: ClassId, sup: ClassId) -> bool {
        if sup == self.object() {
            return true;
        }
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([sub]);
        while let Some(c) = queue.pop_front() {
            if c == sup {
                return true;
            }
            if !visited.insert(c) {
                continue;
            }
            let decl = self.class(c);
            queue.extend(decl.superclass);
            queue.extend(decl.interfaces.iter().copied());
        }
        false
    }

    /// Non-interface classes whose superclass is `c`.
    pub fn direct_subclasses(&self, c: ClassId) -> Vec<ClassId> {
        self.classes()
            .filter(|&d| {
                let decl = self.class(d);
                !decl.is_interface && decl.superclass == Some(c)
            })
            .collect()
    }

    /// Non-interface classes that list `i` among their interfaces.
    pub fn direct_implementers(&self, i: ClassId) -> Vec<ClassId> {
        self.classes()
            .filter(|&d| {
                let decl = self.class(d);
                !decl.is_interface && decl.interfaces.contains(&i)
            })
            .collect()
    }

    /// Interfaces that extend `i`.
    pub fn direct_subinterfaces(&self, i: ClassId) -> Vec<ClassId> {
        self.classes()
            .filter(|&d| {
                let decl = self.class(d);
                decl.is_interface && decl.interfaces.contains(&i)
            })
            .collect()
    }

    /// Transitive subclasses of `c`, excluding `c`.
    pub fn all_subclasses(&self, c: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from(self.direct_subclasses(c));
        while let Some(d) = queue.pop_front() {
            if out.contains(&d) {
                continue;
            }
            out.push(d);
            queue.extend(self.direct_subclasses(d));
        }
        out
    }

    /// Transitive sub-interfaces of `i`, excluding `i`.
    pub fn subinterfaces_of(&self, i: ClassId) -> Vec<ClassId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from(self.direct_subinterfaces(i));
        while let Some(d) = queue.pop_front() {
            if out.contains(&d) {
                continue;
            }
            out.push(d);
            queue.extend(self.direct_subinterfaces(d));
        }
        out
    }

    /// All non-interface classes implementing `i`, directly or through a
    /// sub-interface or a superclass.
    pub fn implementers_of(&self, i: ClassId) -> Vec<ClassId> {
        let mut interfaces = vec![i];
        interfaces.extend(self.subinterfaces_of(i));
        let mut out = Vec::new();
        for j in interfaces {
            for c in self.direct_implementers(j) {
                for d in std::iter::once(c).chain(self.all_subclasses(c)) {
                    if !out.contains(&d) {
                        out.push(d);
                    }
                }
            }
        }
        out
    }

    /// Concrete classes that a value of static type `c` may have at runtime and
    /// that have no subclasses themselves.
    pub fn leaf_classes(&self, c: ClassId) -> Vec<ClassId> {
        let candidates = if self.class(c).is_interface {
            self.implementers_of(c)
        } else {
            std::iter::once(c).chain(self.all_subclasses(c)).collect()
        };
        candidates
            .into_iter()
            .filter(|&d| self.direct_subclasses(d).is_empty())
            .collect()
    }

    /// Finds the declaration that a call through `m` dispatches to when the receiver
    /// has exactly class `m.class`: the superclass chain first, then interfaces.
    pub fn resolve(&self, m: MethodRef) -> Option<MethodRef> {
        let mut current = Some(m.class);
        while let Some(c) = current {
            if let Some(decl) = self.class(c).method(m.sig) {
                return Some(MethodRef::new(c, m.sig, decl.is_static));
            }
            current = self.class(c).superclass;
        }

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        let mut current = Some(m.class);
        while let Some(c) = current {
            queue.extend(self.class(c).interfaces.iter().copied());
            current = self.class(c).superclass;
        }
        while let Some(i) = queue.pop_front() {
            if !visited.insert(i) {
                continue;
            }
            if let Some(decl) = self.class(i).method(m.sig) {
                return Some(MethodRef::new(i, m.sig, decl.is_static));
            }
            queue.extend(self.class(i).interfaces.iter().copied());
        }
        None
    }

    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Void => "void".to_string(),
            Type::Prim(p) => p.to_string(),
            Type::Ref(c) => self.class(*c).name.clone(),
            Type::Array(elem) => format!("{}[]", self.type_name(elem)),
        }
    }

    /// Signature in the form `<Class: ret name(param,param)>`.
    pub fn signature(&self, m: MethodRef) -> String {
        let sig = self.sig(m.sig);
        let params: Vec<String> = sig.params.iter().map(|t| self.type_name(t)).collect();
        format!(
            "<{}: {} {}({})>",
            self.class(m.class).name,
            self.type_name(&sig.ret),
            sig.name,
            params.join(",")
        )
    }
}

/// Incremental construction of a [`Program`].
///
/// The root class `Object` with a body-less library constructor `<init>()` is
/// created up front. Classes default to extending `Object`.
pub struct ProgramBuilder {
    program: Program,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            program: Program {
                classes: Vec::new(),
                sigs: Vec::new(),
                sig_index: HashMap::new(),
                fields: Vec::new(),
                by_name: HashMap::new(),
            },
        };
        let object = builder.push_class(OBJECT, Origin::Library, None, false);
        let init = builder.sig(CONSTRUCTOR, vec![], Type::Void);
        builder.add_method(object, init, false);
        builder
    }

    fn push_class(
        &mut self,
        name: &str,
        origin: Origin,
        superclass: Option<ClassId>,
        is_interface: bool,
    ) -> ClassId {
        let id = ClassId(self.program.classes.len() as u32);
        self.program.classes.push(ClassDecl {
            name: name.to_string(),
            superclass,
            interfaces: Vec::new(),
            is_interface,
            origin,
            methods: Vec::new(),
            replaces: Vec::new(),
        });
        self.program.by_name.insert(name.to_string(), id);
        id
    }

    pub fn object(&self) -> ClassId {
        self.program.object()
    }

    /// Adds a class extending `Object`.
    pub fn add_class(&mut self, name: &str, origin: Origin) -> ClassId {
        let object = self.object();
        self.push_class(name, origin, Some(object), false)
    }

    /// Adds a class with the given superclass.
    pub fn add_subclass(&mut self, name: &str, origin: Origin, superclass: ClassId) -> ClassId {
        self.push_class(name, origin, Some(superclass), false)
    }

    pub fn add_interface(&mut self, name: &str, origin: Origin) -> ClassId {
        self.push_class(name, origin, None, true)
    }

    /// Declares that `class` implements (or, for an interface, extends) `interface`.
    pub fn implements(&mut self, class: ClassId, interface: ClassId) {
        self.program.classes[class.index()].interfaces.push(interface);
    }

    /// Declares `mock` as a stand-in for the library class named `original`.
    pub fn replaces(&mut self, mock: ClassId, original: &str) -> Result<()> {
        let target = self
            .program
            .class_named(original)
            .ok_or_else(|| Error::UnknownClass(original.to_string()))?;
        self.program.classes[mock.index()].replaces.push(target);
        Ok(())
    }

    pub fn class_named(&self, name: &str) -> Result<ClassId> {
        self.program
            .class_named(name)
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    /// Interns a sub-signature.
    pub fn sig(&mut self, name: &str, params: Vec<Type>, ret: Type) -> SigId {
        let sub = SubSignature {
            name: name.to_string(),
            params,
            ret,
        };
        if let Some(&id) = self.program.sig_index.get(&sub) {
            return id;
        }
        let id = SigId(self.program.sigs.len() as u32);
        self.program.sigs.push(sub.clone());
        self.program.sig_index.insert(sub, id);
        id
    }

    /// Declares a method without a body. Use [`set_body`][Self::set_body] to attach one.
    pub fn add_method(&mut self, class: ClassId, sig: SigId, is_static: bool) -> MethodRef {
        let decl = &mut self.program.classes[class.index()];
        if decl.method(sig).is_none() {
            decl.methods.push(MethodDecl {
                sig,
                is_static,
                body: None,
            });
        }
        MethodRef::new(class, sig, is_static)
    }

    pub fn set_body(&mut self, m: MethodRef, body: Body) {
        let decl = &mut self.program.classes[m.class.index()];
        if let Some(method) = decl.methods.iter_mut().find(|d| d.sig == m.sig) {
            method.body = Some(body);
        }
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: Type, is_static: bool) -> FieldId {
        let id = FieldId(self.program.fields.len() as u32);
        self.program.fields.push(FieldDecl {
            class,
            name: name.to_string(),
            ty,
            is_static,
        });
        id
    }

    /// Read access to the program under construction.
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn build(self) -> Program {
        self.program
    }
}
