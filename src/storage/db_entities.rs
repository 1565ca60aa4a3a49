//! SeaORM entity models used by the database storage backend.
//!
//! These structs map to the SQLite tables created by `database_storage`:
//! - `requests` - analyzed HTTP request descriptions
//! - `detections` - signature hits, each owned by one request
//! - `statistics` - one row of counters per calendar date
//! - `security_events` - externally submitted security events
//! - `attack_events` - attacks derived from classified security events
//!
//! Enumerations and timestamps are stored as strings for portability.

/// Requests table entity models.
pub mod requests {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "requests")]
    pub struct Model {
        /// Auto-increment request id
        #[sea_orm(primary_key)]
        pub id: i64,
        pub method: String,
        pub url: String,
        /// Parameters as a JSON object, in submission order
        pub params_json: String,
        pub sandbox_id: String,
        /// Fixed-width RFC3339 UTC timestamp
        pub timestamp: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::detections::Entity")]
        Detections,
    }

    impl Related<super::detections::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Detections.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Detections table entity models.
pub mod detections {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "detections")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        /// Foreign key to `requests.id`
        pub request_id: i64,
        pub detection_type: String,
        pub detection_subtype: String,
        pub risk_level: String,
        /// `URL` or `PARAM_<name>`
        pub location: String,
        pub pattern: String,
        pub input_sample: String,
        pub confidence: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        /// Belongs to a request
        #[sea_orm(
            belongs_to = "super::requests::Entity",
            from = "Column::RequestId",
            to = "super::requests::Column::Id"
        )]
        Request,
    }

    impl Related<super::requests::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Request.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Statistics table entity models.
pub mod statistics {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "statistics")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        /// `YYYY-MM-DD`, unique
        #[sea_orm(unique)]
        pub date: String,
        pub total_requests: i64,
        pub detected_attacks: i64,
        pub sql_injections: i64,
        pub xss_attacks: i64,
        pub path_traversals: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Security events table entity models.
pub mod security_events {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "security_events")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub event_id: String,
        pub timestamp: f64,
        pub event_type: String,
        pub source_ip: String,
        pub destination_ip: String,
        pub description: String,
        pub payload: Option<String>,
        pub user_agent: Option<String>,
        pub method: String,
        pub received_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::attack_events::Entity")]
        AttackEvents,
    }

    impl Related<super::attack_events::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::AttackEvents.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Attack events table entity models.
pub mod attack_events {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "attack_events")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub event_id: String,
        /// Foreign key to `security_events.event_id`
        pub source_event_id: String,
        pub timestamp: f64,
        pub attack_type: String,
        pub source_ip: String,
        pub destination_ip: String,
        pub description: String,
        pub payload: Option<String>,
        pub detected_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        /// Derived from a security event
        #[sea_orm(
            belongs_to = "super::security_events::Entity",
            from = "Column::SourceEventId",
            to = "super::security_events::Column::EventId"
        )]
        SecurityEvent,
    }

    impl Related<super::security_events::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::SecurityEvent.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
