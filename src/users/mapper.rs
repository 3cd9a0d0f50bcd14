use crate::users::{
    dto::{CreateUserRequest, UserResponse},
    repo_types::User,
};

/// Project a stored user onto the public response shape.
pub fn to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        registration_time: user.registration_time,
    }
}

/// Build an unsaved record from client input. The id, normalized fields,
/// registration time and password hash are left for the service to fill.
pub fn to_entity(request: CreateUserRequest) -> User {
    User {
        id: None,
        username: request.username,
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        ..Default::default()
    }
}
