//! # Service Tree Index
//!
//! Read-only projection of the root file's services and their methods, in declaration order.
//!
//! A selection surface addresses nodes through opaque [`SelectionHandle`]s. Only method nodes
//! resolve to a [`MethodDescriptor`]; service headers resolve to nothing and must not enable
//! invocation.
use prost_reflect::{FileDescriptor, MethodDescriptor, ServiceDescriptor};

#[derive(Debug, Clone)]
pub struct ServiceNode {
    service: ServiceDescriptor,
    methods: Vec<MethodDescriptor>,
}

impl ServiceNode {
    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

/// Address of a node in a [`ServiceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionHandle {
    Service { service: usize },
    Method { service: usize, method: usize },
}

#[derive(Debug, Clone, Default)]
pub struct ServiceTree {
    services: Vec<ServiceNode>,
}

impl ServiceTree {
    pub fn build(root: &FileDescriptor) -> Self {
        let services = root
            .services()
            .map(|service| ServiceNode {
                methods: service.methods().collect(),
                service,
            })
            .collect();
        Self { services }
    }

    pub fn services(&self) -> &[ServiceNode] {
        &self.services
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Every node in display order: each service header followed by its methods.
    pub fn handles(&self) -> impl Iterator<Item = SelectionHandle> + '_ {
        self.services
            .iter()
            .enumerate()
            .flat_map(|(service, node)| {
                std::iter::once(SelectionHandle::Service { service }).chain(
                    (0..node.methods.len())
                        .map(move |method| SelectionHandle::Method { service, method }),
                )
            })
    }

    /// Maps a handle back to its method. Service headers and stale handles yield `None`.
    pub fn resolve_selection(&self, handle: SelectionHandle) -> Option<MethodDescriptor> {
        match handle {
            SelectionHandle::Service { .. } => None,
            SelectionHandle::Method { service, method } => self
                .services
                .get(service)
                .and_then(|node| node.methods.get(method))
                .cloned(),
        }
    }

    /// Display text of a node: the service's full name, or the method's name.
    pub fn label(&self, handle: SelectionHandle) -> Option<String> {
        match handle {
            SelectionHandle::Service { service } => self
                .services
                .get(service)
                .map(|node| node.service.full_name().to_string()),
            SelectionHandle::Method { .. } => self
                .resolve_selection(handle)
                .map(|method| method.name().to_string()),
        }
    }

    /// Whether selecting `handle` may enable invocation.
    pub fn is_invocable(&self, handle: SelectionHandle) -> bool {
        self.resolve_selection(handle)
            .is_some_and(|m| !m.is_client_streaming() && !m.is_server_streaming())
    }

    /// Finds a method by service (full or short name) and method name.
    pub fn find_method(&self, service: &str, method: &str) -> Option<SelectionHandle> {
        self.services
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.service.full_name() == service || node.service.name() == service
            })
            .find_map(|(service, node)| {
                node.methods
                    .iter()
                    .position(|m| m.name() == method)
                    .map(|method| SelectionHandle::Method { service, method })
            })
    }
}
