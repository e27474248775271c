//! Per-operation optimism and reconciliation policy.

use core::fmt;

/// Operations the cart store performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartOperation {
    Load,
    AddLine,
    RemoveLine,
    UpdateQuantity,
    Clear,
}

impl CartOperation {
    /// All operations, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Load,
        Self::AddLine,
        Self::RemoveLine,
        Self::UpdateQuantity,
        Self::Clear,
    ];

    /// Lowercase human-readable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::AddLine => "add line",
            Self::RemoveLine => "remove line",
            Self::UpdateQuantity => "update quantity",
            Self::Clear => "clear",
        }
    }
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an operation treats the local snapshot around its gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct MutationPolicy {
    /// Blocked with `Unauthenticated` when no credential is present.
    pub requires_auth: bool,
    /// Apply the expected result locally before the gateway confirms it.
    pub optimistic: bool,
    /// Re-fetch the basket after the gateway call succeeds.
    pub reconcile_on_success: bool,
    /// Re-fetch the basket after the gateway call fails.
    pub reconcile_on_failure: bool,
    /// Publish a success notice.
    pub announce_success: bool,
}

impl MutationPolicy {
    /// The policy table.
    ///
    /// | Operation       | auth | optimistic | reconcile ok | reconcile err | announce |
    /// |-----------------|------|------------|--------------|---------------|----------|
    /// | Load            | no   | no         | no           | no            | no       |
    /// | AddLine         | yes  | no         | yes          | yes           | yes      |
    /// | RemoveLine      | yes  | no         | yes          | yes           | yes      |
    /// | UpdateQuantity  | yes  | no         | yes          | yes           | yes      |
    /// | Clear           | yes  | yes        | no           | no            | no       |
    ///
    /// Add never splices locally because the gateway may merge duplicate
    /// product lines. Remove never drops the line locally so a failed call
    /// cannot leave a phantom-empty cart. Clear is optimistic and silent: it
    /// usually runs as part of checkout, which announces its own success.
    #[must_use]
    pub const fn for_operation(operation: CartOperation) -> Self {
        match operation {
            CartOperation::Load => Self {
                requires_auth: false,
                optimistic: false,
                reconcile_on_success: false,
                reconcile_on_failure: false,
                announce_success: false,
            },
            CartOperation::AddLine | CartOperation::RemoveLine | CartOperation::UpdateQuantity => {
                Self {
                    requires_auth: true,
                    optimistic: false,
                    reconcile_on_success: true,
                    reconcile_on_failure: true,
                    announce_success: true,
                }
            }
            CartOperation::Clear => Self {
                requires_auth: true,
                optimistic: true,
                reconcile_on_success: false,
                reconcile_on_failure: false,
                announce_success: false,
            },
        }
    }
}
