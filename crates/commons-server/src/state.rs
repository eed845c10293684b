use crate::services::{
    community::CommunityService, invitation::InvitationService, membership::MembershipService,
    user::UserService,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    pub database_url: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:commons.db".to_string());

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using default (insecure for production!)");
            "dev-secret-change-in-production".to_string()
        });

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(Config {
            bind_address,
            database_url,
            jwt_secret,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: SqlitePool,
    pub user_service: UserService,
    pub community_service: CommunityService,
    pub membership_service: MembershipService,
    pub invitation_service: InvitationService,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let user_service = UserService::new(db.clone());
        let community_service = CommunityService::new(db.clone());
        let membership_service = MembershipService::new(db.clone());
        let invitation_service = InvitationService::new(db.clone());

        Self {
            config,
            db,
            user_service,
            community_service,
            membership_service,
            invitation_service,
        }
    }
}
