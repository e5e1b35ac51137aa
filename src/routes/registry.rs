use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::middleware::auth::select_authorizer;
use crate::pipeline::compile_chain;
use crate::routes::{router_path, Route, RouteDescriptor};
use crate::types::HttpMethod;

/// Ordering of routes in the table.
///
/// Weighted routes sort ascending; an unweighted route sorts before any
/// weighted one; two unweighted routes compare equal so the stable sort keeps
/// their declaration order.
pub fn compare_route_weights(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Collects endpoint declarations in order
#[derive(Default)]
pub struct RouteRegistry {
    descriptors: Vec<RouteDescriptor>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: RouteDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Validate every descriptor and build the routing table
    pub fn load(self) -> Result<RouteTable, ConfigError> {
        let mut routes = Vec::with_capacity(self.descriptors.len());
        let mut mounted: HashMap<(HttpMethod, String), String> = HashMap::new();

        for descriptor in self.descriptors {
            let RouteDescriptor { name, config, artifacts } = descriptor;
            let config = config.ok_or_else(|| ConfigError::RouteUndefined(name.clone()))?;

            if !config.path.starts_with('/') {
                return Err(ConfigError::InvalidPath {
                    route: name,
                    path: config.path,
                });
            }

            let path = router_path(&config.path);
            if let Some(first) = mounted.insert((config.http_method, path.clone()), name.clone()) {
                return Err(ConfigError::DuplicateRoute {
                    method: config.http_method,
                    path,
                    first,
                    second: name,
                });
            }

            let authorizer = select_authorizer(&name, config.auth_level)?;
            let steps = compile_chain(&name, artifacts)?;

            tracing::debug!(
                "Loaded route '{}': {} {} ({:?})",
                name,
                config.http_method,
                path,
                steps
            );

            routes.push(Arc::new(Route {
                name,
                config,
                router_path: path,
                authorizer,
                steps,
            }));
        }

        routes.sort_by(|a, b| compare_route_weights(a.config.weight, b.config.weight));
        tracing::info!("Route table loaded with {} routes", routes.len());

        Ok(RouteTable { routes })
    }
}

/// The ordered, immutable set of loaded routes
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|route| route.name == name)
    }
}
