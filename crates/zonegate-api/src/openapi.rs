//! OpenAPI documentation
//!
//! Provides the OpenAPI 3.0 specification and Swagger UI for the Zonegate API.

use crate::auth::AppState;
use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Create OpenAPI routes
pub fn create_openapi_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui))
}

/// OpenAPI JSON specification endpoint
async fn openapi_json() -> impl IntoResponse {
    Json(get_openapi_spec())
}

/// Swagger UI HTML endpoint
async fn swagger_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

/// Get the OpenAPI specification as JSON
fn get_openapi_spec() -> serde_json::Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Zonegate API",
            "description": "REST API behind the Zonegate gateway: disposable mailboxes, short links and self-service DNS records.\n\n## Responses\n\nEvery JSON response carries a `success` flag. Errors add a human-readable `error` and a stable `code`.\n\n## Admin endpoints\n\nPrivileged endpoints require the `X-Admin-Key` header. They answer 503 while no key is configured.",
            "version": "1.0.0",
            "contact": {
                "name": "Zonegate Contributors",
                "url": "https://github.com/example/zonegate"
            },
            "license": {
                "name": "Apache-2.0",
                "url": "https://www.apache.org/licenses/LICENSE-2.0"
            }
        },
        "servers": [
            {
                "url": "/",
                "description": "This deployment"
            }
        ],
        "tags": [
            {"name": "health", "description": "Health check endpoints"},
            {"name": "domains", "description": "Mail domain directory"},
            {"name": "emails", "description": "Disposable mailboxes"},
            {"name": "links", "description": "Short links"},
            {"name": "dns", "description": "Self-service DNS records"}
        ],
        "paths": {
            // Health endpoints
            "/health": {
                "get": {
                    "tags": ["health"],
                    "summary": "Basic health check",
                    "operationId": "health",
                    "responses": {
                        "200": {"description": "Service is healthy"}
                    }
                }
            },
            "/health/live": {
                "get": {
                    "tags": ["health"],
                    "summary": "Liveness probe",
                    "operationId": "liveness",
                    "responses": {
                        "200": {"description": "Service is alive"}
                    }
                }
            },
            "/health/ready": {
                "get": {
                    "tags": ["health"],
                    "summary": "Readiness probe",
                    "operationId": "readiness",
                    "responses": {
                        "200": {"description": "Service is ready"},
                        "503": {"description": "Database is not reachable"}
                    }
                }
            },
            // Domain directory
            "/api/domains": {
                "get": {
                    "tags": ["domains"],
                    "summary": "List serviced mail domains",
                    "operationId": "listDomains",
                    "responses": {
                        "200": {
                            "description": "Domain list",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/DomainsResponse"}
                                }
                            }
                        }
                    }
                },
                "post": {
                    "tags": ["domains"],
                    "summary": "Register a domain",
                    "operationId": "createDomain",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/CreateDomainRequest"}
                            }
                        }
                    },
                    "responses": {
                        "201": {"description": "Domain registered, refreshed list returned"},
                        "409": {"description": "Domain already registered"}
                    }
                }
            },
            "/api/domains/{name}": {
                "delete": {
                    "tags": ["domains"],
                    "summary": "Remove a domain (admin)",
                    "operationId": "deleteDomain",
                    "security": [{"admin_key": []}],
                    "parameters": [
                        {"name": "name", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {"description": "Domain removed, refreshed list returned"},
                        "404": {"description": "Domain not registered"}
                    }
                }
            },
            // Mailboxes
            "/api/emails": {
                "post": {
                    "tags": ["emails"],
                    "summary": "Store an inbound message",
                    "operationId": "ingestEmail",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/IngestEmailRequest"}
                            }
                        }
                    },
                    "responses": {
                        "201": {"description": "Message stored"},
                        "400": {"description": "Missing or invalid addresses"}
                    }
                }
            },
            "/api/emails/{recipient}": {
                "get": {
                    "tags": ["emails"],
                    "summary": "List messages for a mailbox, newest first",
                    "operationId": "listEmails",
                    "parameters": [
                        {"name": "recipient", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"name": "hide_spam", "in": "query", "schema": {"type": "string", "enum": ["true", "false"]}}
                    ],
                    "responses": {
                        "200": {
                            "description": "Mailbox listing",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/EmailListResponse"}
                                }
                            }
                        }
                    }
                }
            },
            "/api/emails/{recipient}/{id}": {
                "delete": {
                    "tags": ["emails"],
                    "summary": "Delete a message from its own mailbox",
                    "operationId": "deleteEmail",
                    "parameters": [
                        {"name": "recipient", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "200": {"description": "Message deleted"},
                        "404": {"description": "No such message in this mailbox"}
                    }
                }
            },
            // Short links
            "/api/links": {
                "post": {
                    "tags": ["links"],
                    "summary": "Create a short link",
                    "operationId": "createLink",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/CreateLinkRequest"}
                            }
                        }
                    },
                    "responses": {
                        "201": {
                            "description": "Link created",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/LinkResponse"}
                                }
                            }
                        },
                        "400": {"description": "Invalid URL or custom code"},
                        "409": {"description": "Custom code already taken"}
                    }
                }
            },
            "/api/links/{code}": {
                "get": {
                    "tags": ["links"],
                    "summary": "Link details",
                    "operationId": "getLink",
                    "parameters": [
                        {"name": "code", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {"description": "Link details"},
                        "404": {"description": "Unknown code"}
                    }
                }
            },
            "/api/links/{code}/redirect": {
                "get": {
                    "tags": ["links"],
                    "summary": "Resolve a code and count the click",
                    "operationId": "resolveLink",
                    "parameters": [
                        {"name": "code", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {"description": "Target URL"},
                        "404": {"description": "Unknown code"},
                        "410": {"description": "Link has expired"}
                    }
                }
            },
            "/api/links/{code}/stats": {
                "get": {
                    "tags": ["links"],
                    "summary": "Click statistics",
                    "operationId": "linkStats",
                    "parameters": [
                        {"name": "code", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {"description": "Statistics"},
                        "404": {"description": "Unknown code"}
                    }
                }
            },
            // DNS records
            "/api/dns": {
                "post": {
                    "tags": ["dns"],
                    "summary": "Register a DNS record",
                    "description": "The user_key supplied here becomes the record's management credential; keep it. Records are mirrored to the external provider when configured.",
                    "operationId": "createDnsRecord",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/CreateRecordRequest"}
                            }
                        }
                    },
                    "responses": {
                        "201": {
                            "description": "Record created",
                            "content": {
                                "application/json": {
                                    "schema": {"$ref": "#/components/schemas/RecordResponse"}
                                }
                            }
                        },
                        "400": {"description": "Validation failure"},
                        "403": {"description": "Reserved subdomain"},
                        "409": {"description": "Duplicate or CNAME conflict"}
                    }
                }
            },
            "/api/dns/public/list": {
                "get": {
                    "tags": ["dns"],
                    "summary": "Public directory with masked values",
                    "operationId": "listPublicRecords",
                    "responses": {
                        "200": {"description": "All records, values masked"}
                    }
                }
            },
            "/api/dns/check/{subdomain}": {
                "get": {
                    "tags": ["dns"],
                    "summary": "Availability probe",
                    "operationId": "checkSubdomain",
                    "parameters": [
                        {"name": "subdomain", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"name": "zone", "in": "query", "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {"description": "Availability and reason when taken"}
                    }
                }
            },
            "/api/dns/{subdomain}/resolve": {
                "get": {
                    "tags": ["dns"],
                    "summary": "Active records for a name",
                    "operationId": "resolveRecords",
                    "parameters": [
                        {"name": "subdomain", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"name": "zone", "in": "query", "schema": {"type": "string"}},
                        {"name": "type", "in": "query", "schema": {"type": "string"}}
                    ],
                    "responses": {
                        "200": {"description": "Records in priority order"},
                        "404": {"description": "No active records"}
                    }
                }
            },
            "/api/dns/{id}": {
                "put": {
                    "tags": ["dns"],
                    "summary": "Update an owned record",
                    "operationId": "updateDnsRecord",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {"$ref": "#/components/schemas/UpdateRecordRequest"}
                            }
                        }
                    },
                    "responses": {
                        "200": {"description": "Updated record"},
                        "403": {"description": "Key does not match"},
                        "404": {"description": "Record not found"}
                    }
                },
                "delete": {
                    "tags": ["dns"],
                    "summary": "Delete any record (admin)",
                    "operationId": "adminDeleteRecord",
                    "security": [{"admin_key": []}],
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "responses": {
                        "200": {"description": "Record deleted"},
                        "404": {"description": "Record not found"}
                    }
                }
            },
            "/api/dns/user/{id}": {
                "delete": {
                    "tags": ["dns"],
                    "summary": "Delete a record with its management key",
                    "operationId": "deleteOwnRecord",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}
                    ],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "required": ["user_key"],
                                    "properties": {"user_key": {"type": "string"}}
                                }
                            }
                        }
                    },
                    "responses": {
                        "200": {"description": "Record deleted"},
                        "403": {"description": "Key does not match"},
                        "404": {"description": "Record not found"}
                    }
                }
            }
        },
        "components": {
            "securitySchemes": {
                "admin_key": {
                    "type": "apiKey",
                    "in": "header",
                    "name": "X-Admin-Key"
                }
            },
            "schemas": {
                "ErrorResponse": {
                    "type": "object",
                    "properties": {
                        "success": {"type": "boolean", "example": false},
                        "error": {"type": "string"},
                        "code": {"type": "string", "example": "VALIDATION_ERROR"}
                    }
                },
                "DomainsResponse": {
                    "type": "object",
                    "properties": {
                        "success": {"type": "boolean"},
                        "domains": {
                            "type": "array",
                            "items": {"$ref": "#/components/schemas/Domain"}
                        }
                    }
                },
                "Domain": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string", "format": "uuid"},
                        "name": {"type": "string", "example": "example.site"},
                        "api_base": {"type": "string", "example": "https://api.example.site"},
                        "created_at": {"type": "string", "format": "date-time"}
                    }
                },
                "CreateDomainRequest": {
                    "type": "object",
                    "required": ["name", "api_base"],
                    "properties": {
                        "name": {"type": "string"},
                        "api_base": {"type": "string"}
                    }
                },
                "IngestEmailRequest": {
                    "type": "object",
                    "required": ["to", "from"],
                    "properties": {
                        "to": {"type": "string", "format": "email"},
                        "from": {"type": "string"},
                        "subject": {"type": "string"},
                        "text": {"type": "string"},
                        "html": {"type": "string"},
                        "raw": {"type": "string"},
                        "verification_code": {"type": "string"},
                        "summary": {"type": "string"},
                        "is_spam": {"type": "boolean", "default": false},
                        "language": {"type": "string"}
                    }
                },
                "EmailListResponse": {
                    "type": "object",
                    "properties": {
                        "success": {"type": "boolean"},
                        "email": {"type": "string"},
                        "count": {"type": "integer"},
                        "emails": {"type": "array", "items": {"type": "object"}}
                    }
                },
                "CreateLinkRequest": {
                    "type": "object",
                    "required": ["url"],
                    "properties": {
                        "url": {"type": "string", "example": "https://example.com/some/long/path"},
                        "custom_code": {"type": "string", "pattern": "^[A-Za-z0-9_-]{3,20}$"},
                        "title": {"type": "string"},
                        "expires_in_hours": {"type": "integer", "minimum": 1}
                    }
                },
                "LinkResponse": {
                    "type": "object",
                    "properties": {
                        "success": {"type": "boolean"},
                        "link": {
                            "type": "object",
                            "properties": {
                                "code": {"type": "string"},
                                "short_url": {"type": "string"},
                                "original_url": {"type": "string"},
                                "title": {"type": "string"},
                                "expires_at": {"type": "string", "format": "date-time"}
                            }
                        }
                    }
                },
                "CreateRecordRequest": {
                    "type": "object",
                    "required": ["subdomain", "zone", "type", "value", "user_key"],
                    "properties": {
                        "subdomain": {"type": "string", "example": "blog"},
                        "zone": {"type": "string", "example": "example.site"},
                        "type": {"type": "string", "enum": ["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA", "REDIRECT"]},
                        "value": {"type": "string", "example": "192.0.2.1"},
                        "ttl": {"type": "integer", "default": 3600},
                        "priority": {"type": "integer", "default": 0},
                        "proxied": {"type": "boolean", "default": false},
                        "owner_email": {"type": "string", "format": "email"},
                        "user_key": {"type": "string", "minLength": 6}
                    }
                },
                "UpdateRecordRequest": {
                    "type": "object",
                    "required": ["user_key"],
                    "properties": {
                        "value": {"type": "string"},
                        "ttl": {"type": "integer"},
                        "priority": {"type": "integer"},
                        "proxied": {"type": "boolean"},
                        "user_key": {"type": "string"}
                    }
                },
                "RecordResponse": {
                    "type": "object",
                    "properties": {
                        "success": {"type": "boolean"},
                        "record": {
                            "type": "object",
                            "properties": {
                                "id": {"type": "string", "format": "uuid"},
                                "subdomain": {"type": "string"},
                                "zone": {"type": "string"},
                                "fqdn": {"type": "string"},
                                "type": {"type": "string"},
                                "value": {"type": "string"},
                                "ttl": {"type": "integer"},
                                "priority": {"type": "integer"},
                                "proxied": {"type": "boolean"},
                                "mirrored": {"type": "boolean"}
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Swagger UI HTML template
const SWAGGER_UI_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Zonegate API Documentation</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui.css" />
    <style>
        body { margin: 0; padding: 0; }
        .swagger-ui .topbar { display: none; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.9.0/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/api/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIBundle.SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>"#;
