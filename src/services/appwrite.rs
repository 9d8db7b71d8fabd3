use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use validator::Validate;
use crate::models::{Candidate, FilterCriteria, SubmitDecisionRequest, SubmitDecisionResponse, Verdict};
use super::{DecisionService, ProfileFeed, ServiceError};

/// Appwrite API client
///
/// Backs both collaborators of the swipe engine:
/// - Fetching the candidate feed
/// - Recording swipes and resolving mutual matches
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub user_profiles: String,
    pub swipes: String,
    pub matches: String,
}

/// Outcome of a document insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Insert {
    Created,
    Conflict,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        request_timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    /// List documents matching the given Appwrite queries
    async fn list_documents(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<Vec<Value>, ServiceError> {
        let queries_json = serde_json::to_string(queries)
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to encode queries: {}", e)))?;
        let url = format!(
            "{}?query={}",
            self.documents_url(collection),
            urlencoding::encode(&queries_json)
        );

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ServiceError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ServiceError::ApiError(format!(
                "Failed to list {}: {}",
                collection, status
            )));
        }

        let json: Value = response.json().await?;

        json.get("documents")
            .and_then(|d| d.as_array())
            .cloned()
            .ok_or_else(|| ServiceError::InvalidResponse("Missing documents array".into()))
    }

    /// Create a document, reporting an id/unique-index conflict separately
    async fn create_document(&self, collection: &str, payload: Value) -> Result<Insert, ServiceError> {
        let response = self
            .client
            .post(self.documents_url(collection))
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Ok(Insert::Conflict),
            StatusCode::UNAUTHORIZED => Err(ServiceError::Unauthorized),
            status if status.is_success() => Ok(Insert::Created),
            status => {
                let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Failed to create document in {}: {} - {}", collection, status, body);
                Err(ServiceError::ApiError(format!(
                    "Failed to create document in {}: {}",
                    collection, status
                )))
            }
        }
    }

    /// Whether the candidate has already expressed interest in the user
    async fn has_reverse_interest(&self, user_id: &str, candidate_id: &str) -> Result<bool, ServiceError> {
        let queries = vec![
            format!("equal(\"userId\", \"{}\")", candidate_id),
            format!("equal(\"targetUserId\", \"{}\")", user_id),
            format!(
                "equal(\"action\", [\"{}\", \"{}\"])",
                Verdict::Like.as_str(),
                Verdict::SuperLike.as_str()
            ),
            "limit(1)".to_string(),
        ];

        let documents = self.list_documents(&self.collections.swipes, &queries).await?;
        Ok(!documents.is_empty())
    }
}

#[async_trait]
impl ProfileFeed for AppwriteClient {
    async fn fetch_candidates(&self, criteria: &FilterCriteria) -> Result<Vec<Candidate>, ServiceError> {
        criteria.validate()?;

        let mut queries = vec![
            "equal(\"isActive\", true)".to_string(),
            format!("notEqual(\"userId\", \"{}\")", criteria.user_id), // Exclude self
        ];

        if !criteria.preferred_genders.is_empty() {
            let gender_filter = criteria
                .preferred_genders
                .iter()
                .map(|g| format!("\"{}\"", g))
                .collect::<Vec<_>>()
                .join(",");
            queries.push(format!("equal(\"gender\", [{}])", gender_filter));
        }

        if let Some(min_age) = criteria.min_age {
            queries.push(format!("greaterThanEqual(\"age\", {})", min_age));
        }
        if let Some(max_age) = criteria.max_age {
            queries.push(format!("lessThanEqual(\"age\", {})", max_age));
        }

        for id in &criteria.exclude_user_ids {
            queries.push(format!("notEqual(\"userId\", \"{}\")", id));
        }

        queries.push(format!("limit({})", criteria.limit));

        let documents = self
            .list_documents(&self.collections.user_profiles, &queries)
            .await?;

        let candidates: Vec<Candidate> = documents
            .iter()
            .filter_map(Candidate::from_document)
            .filter(|c| c.id != criteria.user_id && !criteria.exclude_user_ids.contains(&c.id))
            .collect();

        tracing::debug!(
            "Fetched {} candidates for {} ({} documents)",
            candidates.len(),
            criteria.user_id,
            documents.len()
        );

        Ok(candidates)
    }
}

#[async_trait]
impl DecisionService for AppwriteClient {
    async fn submit_decision(
        &self,
        user_id: &str,
        candidate_id: &str,
        verdict: Verdict,
    ) -> Result<SubmitDecisionResponse, ServiceError> {
        let request = SubmitDecisionRequest {
            user_id: user_id.to_string(),
            target_user_id: candidate_id.to_string(),
            action: verdict,
            created_at: chrono::Utc::now(),
        };
        request.validate()?;

        let mut payload = serde_json::to_value(&request)
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to encode swipe: {}", e)))?;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("$id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }

        let swipe = self.create_document(&self.collections.swipes, payload).await?;
        if swipe == Insert::Conflict {
            tracing::debug!("Swipe {} -> {} already exists", user_id, candidate_id);
        }

        // A stored swipe may come from an attempt that failed before the match
        // check, so positive verdicts are always checked again
        if !verdict.is_positive() || !self.has_reverse_interest(user_id, candidate_id).await? {
            return Ok(match swipe {
                Insert::Created => SubmitDecisionResponse::no_match(),
                Insert::Conflict => SubmitDecisionResponse::rejected("already_decided"),
            });
        }

        let match_id = match_document_id(user_id, candidate_id);
        let match_doc = json!({
            "$id": match_id.clone(),
            "user1Id": user_id,
            "user2Id": candidate_id,
            "matchedAt": chrono::Utc::now(),
        });

        // A conflict means the other side's swipe or an earlier attempt
        // created the same match document
        let insert = self.create_document(&self.collections.matches, match_doc).await?;
        let response = SubmitDecisionResponse::matched(match_id);

        if insert == Insert::Conflict {
            tracing::debug!("Match between {} and {} already recorded", user_id, candidate_id);
            return Ok(response);
        }

        tracing::debug!("Recorded match between {} and {}", user_id, candidate_id);

        Ok(response)
    }
}

/// Match document id shared by both users of a pair
fn match_document_id(user_id: &str, candidate_id: &str) -> String {
    let (first, second) = if user_id <= candidate_id {
        (user_id, candidate_id)
    } else {
        (candidate_id, user_id)
    };
    let key = format!("{}:{}", first, second);

    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}
