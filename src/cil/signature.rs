use super::type_graph::{TypeGraph, TypeHierarchy, TypeId};
use super::VerifiableType;

/// How a method gets invoked
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallKind {
    /// Non-virtual dispatch (`call`, `ldftn`, `newobj`)
    Direct,

    /// Virtual dispatch (`callvirt`, `ldvirtftn`)
    Virtual,
}

/// Method signature, as seen from a particular call site
#[derive(Clone, PartialEq, Debug)]
pub struct MethodSignature<'g> {
    /// Type on which the method is declared
    pub declaring_type: TypeId<'g>,

    /// Declared parameters, excluding any receiver
    pub parameters: Vec<VerifiableType<'g>>,

    /// Declared return type (`System.Void` when nothing is returned)
    pub return_type: VerifiableType<'g>,

    pub is_static: bool,

    pub call_kind: CallKind,
}

impl<'g> MethodSignature<'g> {
    /// Type of the implicit `this` argument, if there is one
    ///
    /// Value types are received as a managed pointer when called directly, but boxed when called
    /// through virtual dispatch (which needs an object header).
    pub fn receiver_type(&self, graph: &TypeGraph<'g>) -> Option<VerifiableType<'g>> {
        if self.is_static {
            None
        } else if self.declaring_type.is_boxable() {
            Some(match self.call_kind {
                CallKind::Virtual => VerifiableType::boxed(self.declaring_type),
                CallKind::Direct => VerifiableType::declared(graph.by_ref_of(self.declaring_type)),
            })
        } else {
            Some(VerifiableType::declared(self.declaring_type))
        }
    }

    /// All arguments, including any receiver, in the order they are pushed
    pub fn argument_types(&self, graph: &TypeGraph<'g>) -> Vec<VerifiableType<'g>> {
        self.receiver_type(graph)
            .into_iter()
            .chain(self.parameters.iter().copied())
            .collect()
    }

    /// Does calling this method push a result?
    pub fn returns_value(&self) -> bool {
        !self.return_type.is_void()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::type_graph::TypeGraphArenas;
    use crate::cil::{Name, TypeName};

    #[test]
    fn receivers() {
        let arenas = TypeGraphArenas::new();
        let graph = TypeGraph::new(&arenas);
        let core = graph.core();
        let point = graph.add_value_type(TypeName::from_str("Geometry.Point").unwrap());

        let mut signature = MethodSignature {
            declaring_type: point,
            parameters: vec![VerifiableType::declared(core.int32)],
            return_type: VerifiableType::declared(core.void),
            is_static: false,
            call_kind: CallKind::Virtual,
        };
        assert_eq!(
            signature.receiver_type(&graph),
            Some(VerifiableType::boxed(point))
        );

        signature.call_kind = CallKind::Direct;
        assert_eq!(
            signature.receiver_type(&graph),
            Some(VerifiableType::declared(graph.by_ref_of(point)))
        );
        assert_eq!(signature.argument_types(&graph).len(), 2);
        assert!(!signature.returns_value());

        signature.is_static = true;
        assert_eq!(signature.receiver_type(&graph), None);

        let string = MethodSignature {
            declaring_type: core.string,
            parameters: vec![],
            return_type: VerifiableType::declared(core.int32),
            is_static: false,
            call_kind: CallKind::Direct,
        };
        assert_eq!(
            string.receiver_type(&graph),
            Some(VerifiableType::declared(core.string))
        );
        assert!(string.returns_value());
    }
}
