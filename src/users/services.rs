use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::users::{
    dto::{CreateUserRequest, UpdatePasswordRequest, UpdateUserRequest, UserResponse},
    error::UserError,
    mapper,
    password::{hash_password, verify_password},
    repo::UserRepository,
    repo_types::{normalize, User},
};

/// User lifecycle operations on top of a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn list_users(&self) -> Result<Vec<UserResponse>, UserError> {
        let users = self.repo.find_all().await?;
        Ok(users.iter().map(mapper::to_response).collect())
    }

    pub async fn get_user(&self, id: i64) -> Result<UserResponse, UserError> {
        let user = self.find_existing(id).await?;
        Ok(mapper::to_response(&user))
    }

    /// Stores a new user. Duplicate usernames or emails are not rejected.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, UserError> {
        let password_hash = hash_password(&request.password)?;

        let mut user = mapper::to_entity(request);
        user.normalized_username = normalize(&user.username);
        user.normalized_email = normalize(&user.email);
        user.registration_time = Some(OffsetDateTime::now_utc());
        user.password_hash = password_hash;

        let saved = self.repo.save(user).await?;
        info!(user_id = ?saved.id, username = %saved.username, "user created");
        Ok(mapper::to_response(&saved))
    }

    /// Overwrites username, first and last name. The normalized username
    /// follows the new username; email, hash and registration time are kept.
    pub async fn update_user(&self, id: i64, request: UpdateUserRequest) -> Result<(), UserError> {
        let mut user = self.find_existing(id).await?;

        user.first_name = request.first_name;
        user.last_name = request.last_name;
        user.normalized_username = normalize(&request.username);
        user.username = request.username;

        self.repo.save(user).await?;
        info!(user_id = id, "user updated");
        Ok(())
    }

    pub async fn update_password(
        &self,
        id: i64,
        request: UpdatePasswordRequest,
    ) -> Result<(), UserError> {
        if request.new_password != request.new_password_check {
            warn!(user_id = id, "new password confirmation mismatch");
            return Err(UserError::BadRequest(
                "New password in both fields should be equal".into(),
            ));
        }

        let mut user = self.find_existing(id).await?;

        if !verify_password(&request.old_password, &user.password_hash)? {
            warn!(user_id = id, "password change with invalid old password");
            return Err(UserError::Unauthorized);
        }

        user.password_hash = hash_password(&request.new_password)?;
        self.repo.save(user).await?;
        info!(user_id = id, "user password changed");
        Ok(())
    }

    /// Deleting an id that does not exist succeeds without effect.
    pub async fn delete_user(&self, id: i64) -> Result<(), UserError> {
        self.repo.delete_by_id(id).await?;
        info!(user_id = id, "user deleted");
        Ok(())
    }

    async fn find_existing(&self, id: i64) -> Result<User, UserError> {
        self.repo.find_by_id(id).await?.ok_or_else(|| {
            warn!(user_id = id, "user not found");
            UserError::NotFound { id }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo::InMemoryUserRepository;

    fn service() -> (UserService, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        (UserService::new(repo.clone()), repo)
    }

    fn create_request(username: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            first_name: "First".into(),
            last_name: "Last".into(),
        }
    }

    fn password_request(old: &str, new: &str, check: &str) -> UpdatePasswordRequest {
        UpdatePasswordRequest {
            old_password: old.into(),
            new_password: new.into(),
            new_password_check: check.into(),
        }
    }

    async fn stored(repo: &InMemoryUserRepository, id: i64) -> User {
        repo.find_by_id(id).await.unwrap().expect("user should be stored")
    }

    #[tokio::test]
    async fn list_on_empty_store_is_empty() {
        let (service, _) = service();
        assert!(service.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_normalizes_timestamps_and_hashes() {
        let (service, repo) = service();
        let before = OffsetDateTime::now_utc();
        let created = service
            .create_user(create_request("MaríaÖ", "maria@Example.com", "p1"))
            .await
            .unwrap();
        let id = created.id.expect("id assigned");

        let user = stored(&repo, id).await;
        assert_eq!(user.username, "MaríaÖ");
        assert_eq!(user.normalized_username, "MARÍAÖ");
        assert_eq!(user.email, "maria@Example.com");
        assert_eq!(user.normalized_email, "MARIA@EXAMPLE.COM");
        assert_ne!(user.password_hash, "p1");
        assert!(verify_password("p1", &user.password_hash).unwrap());
        assert!(user.registration_time.unwrap() >= before);
    }

    #[tokio::test]
    async fn create_does_not_reject_duplicates() {
        let (service, _) = service();
        service.create_user(create_request("alice", "a@x.com", "p1")).await.unwrap();
        service.create_user(create_request("alice", "a@x.com", "p2")).await.unwrap();
        assert_eq!(service.list_users().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_get_delete_scenario() {
        let (service, _) = service();
        let created = service
            .create_user(create_request("alice", "a@x.com", "p1"))
            .await
            .unwrap();
        let id = created.id.unwrap();

        let fetched = service.get_user(id).await.unwrap();
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.email, "a@x.com");
        let json = serde_json::to_string(&fetched).unwrap();
        assert!(!json.contains("password"));

        service.delete_user(id).await.unwrap();
        let err = service.get_user(id).await.unwrap_err();
        assert!(matches!(err, UserError::NotFound { id: missing } if missing == id));
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let (service, _) = service();
        let err = service.get_user(99).await.unwrap_err();
        assert!(matches!(err, UserError::NotFound { id: 99 }));
    }

    #[tokio::test]
    async fn delete_unknown_id_is_noop() {
        let (service, _) = service();
        service.create_user(create_request("alice", "a@x.com", "p1")).await.unwrap();
        service.delete_user(12345).await.unwrap();
        assert_eq!(service.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_overwrites_names_only() {
        let (service, repo) = service();
        let id = service
            .create_user(create_request("alice", "a@x.com", "p1"))
            .await
            .unwrap()
            .id
            .unwrap();
        let original = stored(&repo, id).await;

        service
            .update_user(
                id,
                UpdateUserRequest {
                    username: "alicia".into(),
                    first_name: "Alicia".into(),
                    last_name: "Keys".into(),
                },
            )
            .await
            .unwrap();

        let updated = stored(&repo, id).await;
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.first_name, "Alicia");
        assert_eq!(updated.last_name, "Keys");
        assert_eq!(updated.email, original.email);
        assert_eq!(updated.normalized_email, original.normalized_email);
        assert_eq!(updated.password_hash, original.password_hash);
        assert_eq!(updated.registration_time, original.registration_time);
    }

    #[tokio::test]
    async fn update_recomputes_normalized_username() {
        let (service, repo) = service();
        let id = service
            .create_user(create_request("alice", "a@x.com", "p1"))
            .await
            .unwrap()
            .id
            .unwrap();

        service
            .update_user(
                id,
                UpdateUserRequest {
                    username: "bob".into(),
                    first_name: String::new(),
                    last_name: String::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(stored(&repo, id).await.normalized_username, "BOB");
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found_and_store_unchanged() {
        let (service, repo) = service();
        service.create_user(create_request("alice", "a@x.com", "p1")).await.unwrap();
        let before = repo.find_all().await.unwrap();

        let err = service
            .update_user(
                77,
                UpdateUserRequest {
                    username: "ghost".into(),
                    first_name: "G".into(),
                    last_name: "H".into(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::NotFound { id: 77 }));
        assert_eq!(repo.find_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn password_mismatch_is_bad_request_even_with_correct_old_password() {
        let (service, repo) = service();
        let id = service
            .create_user(create_request("alice", "a@x.com", "p1"))
            .await
            .unwrap()
            .id
            .unwrap();
        let hash_before = stored(&repo, id).await.password_hash;

        let err = service
            .update_password(id, password_request("p1", "p2", "p3"))
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::BadRequest(_)));
        assert_eq!(stored(&repo, id).await.password_hash, hash_before);
    }

    #[tokio::test]
    async fn password_mismatch_is_checked_before_lookup() {
        let (service, _) = service();
        let err = service
            .update_password(5, password_request("p1", "p2", "p3"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::BadRequest(_)));
    }

    #[tokio::test]
    async fn password_change_on_unknown_id_is_not_found() {
        let (service, _) = service();
        let err = service
            .update_password(5, password_request("p1", "p2", "p2"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound { id: 5 }));
    }

    #[tokio::test]
    async fn password_change_with_wrong_old_password_is_unauthorized() {
        let (service, repo) = service();
        let id = service
            .create_user(create_request("alice", "a@x.com", "p1"))
            .await
            .unwrap()
            .id
            .unwrap();
        let hash_before = stored(&repo, id).await.password_hash;

        let err = service
            .update_password(id, password_request("wrong", "p2", "p2"))
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::Unauthorized));
        assert_eq!(stored(&repo, id).await.password_hash, hash_before);
    }

    #[tokio::test]
    async fn password_change_is_persisted() {
        let (service, repo) = service();
        let id = service
            .create_user(create_request("alice", "a@x.com", "p1"))
            .await
            .unwrap()
            .id
            .unwrap();

        service
            .update_password(id, password_request("p1", "p2", "p2"))
            .await
            .unwrap();

        let hash = stored(&repo, id).await.password_hash;
        assert!(verify_password("p2", &hash).unwrap());
        assert!(!verify_password("p1", &hash).unwrap());
    }
}
