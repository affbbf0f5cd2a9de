// Error codes implementation
// Stable codes carried in every failed `ServiceResult`

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const MISSING_REQUIRED_FIELD: &str = "VALIDATION_1002";
    pub const INVALID_FORMAT: &str = "VALIDATION_1003";
    pub const BENEFIT_RULE_VIOLATION: &str = "VALIDATION_1004";
    pub const INVALID_DATE_RANGE: &str = "VALIDATION_1005";
}

pub mod resource {
    pub const NOT_FOUND: &str = "RESOURCE_2001";
    pub const ALREADY_EXISTS: &str = "RESOURCE_2002";
    pub const PROCESSING_IN_PROGRESS: &str = "RESOURCE_2003";
}

pub mod downstream {
    pub const REQUEST_FAILED: &str = "DOWNSTREAM_3001";
    pub const REJECTED: &str = "DOWNSTREAM_3002";
}

pub mod database {
    pub const CONNECTION_FAILED: &str = "DB_4001";
    pub const QUERY_FAILED: &str = "DB_4002";
    pub const CONSTRAINT_VIOLATION: &str = "DB_4003";
}

pub mod system {
    pub const CONFIGURATION: &str = "SYSTEM_5001";
    pub const INTERNAL: &str = "SYSTEM_5002";
}
