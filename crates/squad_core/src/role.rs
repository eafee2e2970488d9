//! The fixed set of roles on the team.

use serde::{Deserialize, Serialize};

/// A team role. Every work item targets exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ProjectManager,
    Architect,
    TechLead,
    Developer,
    QaEngineer,
}

impl Role {
    /// All roles, in team order.
    pub fn all() -> &'static [Role] {
        &[
            Role::ProjectManager,
            Role::Architect,
            Role::TechLead,
            Role::Developer,
            Role::QaEngineer,
        ]
    }

    /// Order in which queue lanes are served.
    pub fn lane_order() -> &'static [Role] {
        &[
            Role::Developer,
            Role::TechLead,
            Role::QaEngineer,
            Role::Architect,
            Role::ProjectManager,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ProjectManager => "project_manager",
            Role::Architect => "architect",
            Role::TechLead => "tech_lead",
            Role::Developer => "developer",
            Role::QaEngineer => "qa_engineer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::ProjectManager => "Project Manager",
            Role::Architect => "Architect",
            Role::TechLead => "Tech Lead",
            Role::Developer => "Developer",
            Role::QaEngineer => "QA Engineer",
        }
    }

    /// The steps a work item targeting this role runs through.
    ///
    /// Delivery roles run the suffix of Developer, Tech Lead, QA starting at
    /// themselves; planning roles run alone.
    pub fn pipeline(&self) -> &'static [Role] {
        const DELIVERY: [Role; 3] = [Role::Developer, Role::TechLead, Role::QaEngineer];
        match self {
            Role::Developer => &DELIVERY,
            Role::TechLead => &DELIVERY[1..],
            Role::QaEngineer => &DELIVERY[2..],
            Role::ProjectManager => &[Role::ProjectManager],
            Role::Architect => &[Role::Architect],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
