//! JSON:API documents used across the integration tests.

use jsonapi_store::Document;
use serde_json::json;

/// A single `users` resource wrapped in a document.
pub fn user() -> Document {
    serde_json::from_value(json!({
        "data": {
            "id": "1",
            "type": "users",
            "attributes": {
                "title": "Mr",
                "firstName": "Nick",
                "lastName": "Ryall",
                "email": "nick.ryall@example.com",
                "phone": "021552497"
            },
            "relationships": {
                "business": {
                    "data": { "type": "businesses", "id": "1" }
                },
                "projects": {
                    "data": [{ "type": "projects", "id": "1" }]
                }
            }
        }
    }))
    .unwrap()
}

/// A two-member `users` collection with pagination meta and links.
pub fn users() -> Document {
    serde_json::from_value(json!({
        "meta": { "totalPages": 1 },
        "links": {
            "self": "http://example.com/users?page[number]=1",
            "first": "http://example.com/users?page[number]=1&page[size]=1",
            "next": null,
            "prev": null,
            "last": null
        },
        "data": [
            {
                "id": "1",
                "type": "users",
                "attributes": {
                    "title": "Mr",
                    "firstName": "Nick",
                    "lastName": "Ryall",
                    "email": "nick.ryall@example.com",
                    "phone": "021552497"
                },
                "relationships": {
                    "business": { "data": { "type": "businesses", "id": "1" } }
                }
            },
            {
                "id": "2",
                "type": "users",
                "attributes": {
                    "title": "Mr",
                    "firstName": "John",
                    "lastName": "Jones",
                    "email": "john.jones@example.com",
                    "phone": "021552497"
                },
                "relationships": {
                    "business": { "data": { "type": "businesses", "id": "2" } }
                }
            }
        ]
    }))
    .unwrap()
}

/// A collection response that also carries `included` resources.
pub fn users_with_included() -> Document {
    serde_json::from_value(json!({
        "data": [
            { "id": "1", "type": "users", "attributes": { "firstName": "Nick" } }
        ],
        "included": [
            { "id": "1", "type": "businesses", "attributes": { "name": "Acme Inc" } },
            { "id": "2", "type": "businesses", "attributes": { "name": "Other Inc" } }
        ]
    }))
    .unwrap()
}
