use std::collections::HashMap;
use std::sync::RwLock;

use warden_auth::{
    InterfaceGrantRow, MenuGrantRow, OperationGrantRow, PermissionStore, RoleAssignmentRow,
    RoleCode, RoleStatus, StoreError,
};
use warden_core::{GrantScope, RoleId, UserId};

#[derive(Debug, Clone)]
struct RoleDef {
    code: RoleCode,
    status: RoleStatus,
}

#[derive(Debug, Clone)]
struct Assignment {
    user_id: UserId,
    role_id: RoleId,
    scope: GrantScope,
}

#[derive(Debug, Default)]
struct Graph {
    roles: HashMap<RoleId, RoleDef>,
    assignments: Vec<Assignment>,
    menus: Vec<MenuGrantRow>,
    operations: Vec<OperationGrantRow>,
    /// Owning scope of each data resource.
    resources: HashMap<String, GrantScope>,
    interfaces: Vec<(RoleId, String, String, GrantScope)>,
}

/// In-memory role grant graph.
///
/// Queries filter by the requested scopes, the way an indexed SQL query would.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    inner: RwLock<Graph>,
}

fn poisoned() -> StoreError {
    StoreError::storage("permission store lock poisoned")
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_role(&self, code: &str, status: RoleStatus) -> Result<RoleId, StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        let id = RoleId::new();
        graph.roles.insert(
            id,
            RoleDef {
                code: RoleCode::new(code.to_string()),
                status,
            },
        );
        Ok(id)
    }

    pub fn set_role_status(&self, role_id: RoleId, status: RoleStatus) -> Result<(), StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        let role = graph
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| StoreError::not_found(format!("role {role_id}")))?;
        role.status = status;
        Ok(())
    }

    pub fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        scope: GrantScope,
    ) -> Result<(), StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        if !graph.roles.contains_key(&role_id) {
            return Err(StoreError::not_found(format!("role {role_id}")));
        }
        graph.assignments.push(Assignment {
            user_id,
            role_id,
            scope,
        });
        Ok(())
    }

    pub fn grant_menu(
        &self,
        role_id: RoleId,
        menu_code: &str,
        scope: GrantScope,
    ) -> Result<(), StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        graph.menus.push(MenuGrantRow {
            role_id,
            menu_code: menu_code.to_string(),
            scope,
        });
        Ok(())
    }

    /// Remove `role_id`'s grant of `menu_code` under exactly `scope`.
    /// Returns how many rows were dropped.
    pub fn revoke_menu(
        &self,
        role_id: RoleId,
        menu_code: &str,
        scope: GrantScope,
    ) -> Result<usize, StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        let before = graph.menus.len();
        graph
            .menus
            .retain(|m| !(m.role_id == role_id && m.menu_code == menu_code && m.scope == scope));
        Ok(before - graph.menus.len())
    }

    pub fn grant_operation(
        &self,
        role_id: RoleId,
        menu_code: &str,
        operation_code: &str,
        scope: GrantScope,
    ) -> Result<(), StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        graph.operations.push(OperationGrantRow {
            role_id,
            menu_code: menu_code.to_string(),
            operation_code: operation_code.to_string(),
            scope,
        });
        Ok(())
    }

    /// Declare a data resource owned by `scope`.
    pub fn add_resource(&self, resource_code: &str, scope: GrantScope) -> Result<(), StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        graph.resources.insert(resource_code.to_string(), scope);
        Ok(())
    }

    pub fn grant_interface(
        &self,
        role_id: RoleId,
        resource_code: &str,
        interface_code: &str,
        scope: GrantScope,
    ) -> Result<(), StoreError> {
        let mut graph = self.inner.write().map_err(|_| poisoned())?;
        if !graph.resources.contains_key(resource_code) {
            return Err(StoreError::not_found(format!("resource '{resource_code}'")));
        }
        graph.interfaces.push((
            role_id,
            resource_code.to_string(),
            interface_code.to_string(),
            scope,
        ));
        Ok(())
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn roles_for_user(
        &self,
        user_id: UserId,
        scopes: &[GrantScope],
    ) -> Result<Vec<RoleAssignmentRow>, StoreError> {
        let graph = self.inner.read().map_err(|_| poisoned())?;
        Ok(graph
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id && scopes.contains(&a.scope))
            .filter_map(|a| {
                graph.roles.get(&a.role_id).map(|role| RoleAssignmentRow {
                    role_id: a.role_id,
                    role_code: role.code.clone(),
                    role_status: role.status,
                    scope: a.scope,
                })
            })
            .collect())
    }

    fn menus_for_roles(
        &self,
        role_ids: &[RoleId],
        scopes: &[GrantScope],
    ) -> Result<Vec<MenuGrantRow>, StoreError> {
        let graph = self.inner.read().map_err(|_| poisoned())?;
        Ok(graph
            .menus
            .iter()
            .filter(|m| role_ids.contains(&m.role_id) && scopes.contains(&m.scope))
            .cloned()
            .collect())
    }

    fn operations_for_roles(
        &self,
        role_ids: &[RoleId],
        scopes: &[GrantScope],
    ) -> Result<Vec<OperationGrantRow>, StoreError> {
        let graph = self.inner.read().map_err(|_| poisoned())?;
        Ok(graph
            .operations
            .iter()
            .filter(|o| role_ids.contains(&o.role_id) && scopes.contains(&o.scope))
            .cloned()
            .collect())
    }

    fn interfaces_for_roles(
        &self,
        role_ids: &[RoleId],
        scopes: &[GrantScope],
    ) -> Result<Vec<InterfaceGrantRow>, StoreError> {
        let graph = self.inner.read().map_err(|_| poisoned())?;
        Ok(graph
            .interfaces
            .iter()
            .filter(|(role_id, _, _, scope)| role_ids.contains(role_id) && scopes.contains(scope))
            .filter_map(|(role_id, resource, interface, scope)| {
                let resource_scope = *graph.resources.get(resource)?;
                scopes.contains(&resource_scope).then(|| InterfaceGrantRow {
                    role_id: *role_id,
                    resource_code: resource.clone(),
                    interface_code: interface.clone(),
                    resource_scope,
                    scope: *scope,
                })
            })
            .collect())
    }
}
