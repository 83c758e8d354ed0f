// SPDX-License-Identifier: Apache-2.0

use serde_json::{json, Value};

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorEnvelope"}}}
    })
}

fn regulation_record_schema() -> Value {
    json!({
      "type": "object",
      "required": ["fishNameJa", "status", "legalExplanation", "prefecture", "generatedBy", "generatedAt"],
      "properties": {
        "fishNameJa": {"type": "string"},
        "fishNameEn": {"type": "string", "nullable": true},
        "scientificName": {"type": "string", "nullable": true},
        "isLegal": {"type": "boolean", "nullable": true},
        "canTakeHome": {"type": "boolean", "nullable": true},
        "status": {"type": "string", "enum": ["OK", "RESTRICTED", "PROHIBITED", "UNKNOWN"]},
        "legalExplanation": {"type": "string"},
        "minSize": {"type": "number", "nullable": true},
        "maxSize": {"type": "number", "nullable": true},
        "dailyLimit": {"type": "integer", "nullable": true},
        "seasonalBan": {"type": "array", "items": {"type": "string"}},
        "bannedMonths": {"type": "array", "items": {"type": "integer", "minimum": 1, "maximum": 12}},
        "isEdible": {"type": "boolean", "nullable": true},
        "confidence": {"type": "string", "enum": ["high", "medium", "low", "unknown"]},
        "fishingRights": {"type": "object", "nullable": true},
        "prefecture": {"type": "string"},
        "city": {"type": "string", "nullable": true},
        "generatedBy": {"type": "string"},
        "generatedAt": {"type": "string", "format": "date-time"},
        "error": {"type": "boolean"},
        "errorMessage": {"type": "string"}
      }
    })
}

fn component_schemas() -> Value {
    json!({
      "schemas": {
        "CacheKeyResponse": {
          "type": "object",
          "required": ["cacheKey", "region", "species"],
          "properties": {
            "cacheKey": {"type": "string"},
            "region": {"type": "string"},
            "species": {"type": "string"}
          }
        },
        "ErrorEnvelope": {
          "type": "object",
          "required": ["success", "error", "message"],
          "properties": {
            "success": {"type": "boolean", "enum": [false]},
            "error": {"type": "string", "enum": ["invalid input", "payload too large", "fish not identified", "generation error", "system error"]},
            "message": {"type": "string"},
            "suggestions": {"type": "array", "items": {"type": "string"}},
            "debug": {"type": "string"}
          }
        },
        "IdentifyRequest": {
          "type": "object",
          "additionalProperties": false,
          "required": ["image", "region"],
          "properties": {
            "image": {"type": "string", "format": "byte"},
            "region": {"type": "string", "minLength": 1},
            "locality": {"type": "string"},
            "latitude": {"type": "number", "minimum": -90, "maximum": 90},
            "longitude": {"type": "number", "minimum": -180, "maximum": 180}
          }
        },
        "IdentifySuccess": {
          "type": "object",
          "required": ["success", "fromCache", "data", "identifiedFish", "location", "timestamp"],
          "properties": {
            "success": {"type": "boolean", "enum": [true]},
            "fromCache": {"type": "boolean"},
            "data": {"$ref": "#/components/schemas/RegulationRecord"},
            "identifiedFish": {"type": "string"},
            "location": {
              "type": "object",
              "required": ["region"],
              "properties": {
                "region": {"type": "string"},
                "locality": {"type": "string", "nullable": true},
                "lat": {"type": "number"},
                "lon": {"type": "number"}
              }
            },
            "timestamp": {"type": "string", "format": "date-time"}
          }
        },
        "RegulationRecord": regulation_record_schema()
      }
    })
}

#[must_use]
pub fn openapi_v1_spec() -> Value {
    json!({
      "openapi": "3.0.3",
      "info": {"title": "uo-checker API", "version": crate::API_VERSION},
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {"get": {"responses": {"200": {"description": "ready"}, "503": {"description": "not ready"}}}},
        "/v1/version": {"get": {"responses": {"200": {"description": "build and api version"}}}},
        "/v1/openapi.json": {"get": {"responses": {"200": {"description": "this document"}}}},
        "/v1/cache-key": {
          "get": {
            "parameters": [
              {"name": "region", "in": "query", "required": true, "schema": {"type": "string"}},
              {"name": "species", "in": "query", "required": true, "schema": {"type": "string"}}
            ],
            "responses": {
              "200": {"description": "derived cache key", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/CacheKeyResponse"}}}},
              "400": error_response("missing or blank parameter")
            }
          }
        },
        "/v1/identify": {
          "post": {
            "requestBody": {
              "required": true,
              "content": {"application/json": {"schema": {"$ref": "#/components/schemas/IdentifyRequest"}}}
            },
            "responses": {
              "200": {"description": "regulation record", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/IdentifySuccess"}}}},
              "400": error_response("invalid input"),
              "413": error_response("payload too large"),
              "422": error_response("fish not identified"),
              "500": error_response("system error"),
              "502": error_response("generation error")
            }
          }
        }
      },
      "components": component_schemas()
    })
}
