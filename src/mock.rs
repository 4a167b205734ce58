//! Substitution of library classes by application-provided mock classes.
//!
//! An application class may declare that it [`replaces`][crate::program::ClassDecl::replaces]
//! library classes. Calls to a method of a replaced class are then analysed using
//! the body of the method with the same name and parameter types in the mock.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::program::{ClassId, MethodRef, Program};

#[derive(Debug, Clone, Default)]
pub struct MockTable {
    mocks: BTreeMap<ClassId, ClassId>,
}

impl MockTable {
    pub fn new(program: &Program) -> Self {
        let mut mocks = BTreeMap::new();
        for mock in program.classes() {
            let decl = program.class(mock);
            if !decl.is_application() {
                continue;
            }
            for &original in &decl.replaces {
                let original_name = &program.class(original).name;
                match mocks.get(&original) {
                    Some(&previous) => warn!(
                        "class {} has two mock classes {} and {}, using {}",
                        original_name,
                        program.class(previous).name,
                        decl.name,
                        program.class(previous).name
                    ),
                    None => {
                        info!("using mock class {} for {}", decl.name, original_name);
                        mocks.insert(original, mock);
                    }
                }
            }
        }
        Self { mocks }
    }

    pub fn len(&self) -> usize {
        self.mocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mocks.is_empty()
    }

    /// The class that replaces `class`, if any.
    pub fn mock_of(&self, class: ClassId) -> Option<ClassId> {
        self.mocks.get(&class).copied()
    }

    /// Classes that have a mock.
    pub fn mocked_classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.mocks.keys().copied()
    }

    /// The method of the mock class with the same name and parameter types as `m`,
    /// or `m` itself if there is none.
    pub fn mock_method_ref(&self, program: &Program, m: MethodRef) -> MethodRef {
        let Some(mock) = self.mock_of(m.class) else {
            return m;
        };
        let wanted = program.sig(m.sig);
        program
            .class(mock)
            .methods
            .iter()
            .find(|decl| {
                let sig = program.sig(decl.sig);
                sig.name == wanted.name && sig.params == wanted.params
            })
            .map(|decl| MethodRef::new(mock, decl.sig, decl.is_static))
            .unwrap_or(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::program::{Origin, ProgramBuilder, Type};

    #[test]
    fn test_mock_method_ref() {
        let mut b = ProgramBuilder::new();
        let list = b.add_class("List", Origin::Library);
        let mock = b.add_class("MockList", Origin::Application);
        b.replaces(mock, "List").unwrap();
        let object = b.object();
        let add = b.sig("add", vec![Type::Ref(object)], Type::Void);
        let clear = b.sig("clear", vec![], Type::Void);
        let list_add = b.add_method(list, add, false);
        let list_clear = b.add_method(list, clear, false);
        let mock_add = b.add_method(mock, add, false);
        let program = b.build();

        let mocks = MockTable::new(&program);
        assert_eq!(mocks.len(), 1);
        assert_eq!(mocks.mock_of(list), Some(mock));
        assert_eq!(mocks.mock_of(mock), None);
        assert_eq!(mocks.mock_method_ref(&program, list_add), mock_add);
        // Not declared in the mock.
        assert_eq!(mocks.mock_method_ref(&program, list_clear), list_clear);
    }

    #[test]
    fn test_first_mock_wins() {
        let mut b = ProgramBuilder::new();
        let list = b.add_class("List", Origin::Library);
        let first = b.add_class("MockList", Origin::Application);
        let second = b.add_class("OtherMockList", Origin::Application);
        let library_mock = b.add_class("LibraryMockList", Origin::Library);
        b.replaces(first, "List").unwrap();
        b.replaces(second, "List").unwrap();
        b.replaces(library_mock, "List").unwrap();
        let program = b.build();

        let mocks = MockTable::new(&program);
        assert_eq!(mocks.mock_of(list), Some(first));
        assert_eq!(mocks.mocked_classes().collect::<Vec<_>>(), vec![list]);
    }
}
