//! Actor context passed into every state-machine operation.
//!
//! The active unit and the acting user's role are explicit parameters rather than ambient
//! state, so operations can be driven from a CLI, an HTTP handler or a test alike.

use crate::error::{CensusError, CensusResult};
use crate::record::{PatientRecord, Unit};

wire_enum! {
    /// Role of the signed-in user, as resolved by the authentication provider.
    pub enum Role ("role") {
        Admin => "Admin",
        Consultant => "Consultant",
        Staff => "Staff",
    }
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    /// Admins and consultants may create, edit, archive and delete records.
    pub fn can_manage_records(self) -> bool {
        matches!(self, Role::Admin | Role::Consultant)
    }
}

/// Who is acting, and on which unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationContext {
    pub unit: Unit,
    pub role: Role,
}

impl OperationContext {
    pub fn new(unit: Unit, role: Role) -> Self {
        Self { unit, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn can_manage_records(&self) -> bool {
        self.role.can_manage_records()
    }

    pub(crate) fn authorise_mutation(&self, action: &'static str) -> CensusResult<()> {
        if self.can_manage_records() {
            return Ok(());
        }
        Err(CensusError::PermissionDenied {
            role: self.role,
            action,
        })
    }

    pub(crate) fn authorise_unit(&self, record: &PatientRecord) -> CensusResult<()> {
        if record.unit == self.unit {
            return Ok(());
        }
        Err(CensusError::UnitMismatch {
            id: record.id.clone(),
            record_unit: record.unit,
            context_unit: self.unit,
        })
    }
}
