use serde::Deserialize;

/// Wrapper for DockerCopilot API responses.
///
/// The success code varies by endpoint (`0` for the container list, `200`
/// for most others, `201` for auth), so callers check it explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// One container as reported by `GET /api/containers`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "haveUpdate")]
    pub have_update: bool,
    #[serde(rename = "usingImage")]
    pub using_image: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "runningTime", default)]
    pub running_time: String,
    #[serde(rename = "createTime", default)]
    pub create_time: String,
}

/// One image as reported by `GET /api/images`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSummary {
    pub id: String,
    /// Containers currently using this image.
    #[serde(rename = "images", default)]
    pub used_by: Vec<String>,
    pub tag: Option<String>,
}

impl ImageSummary {
    /// Tagged but referenced by no container: safe to prune.
    pub fn is_prunable(&self) -> bool {
        self.used_by.is_empty() && self.tag.is_some()
    }
}

/// Payload of a successful `POST /api/container/{id}/update`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTask {
    #[serde(rename = "taskID")]
    pub task_id: String,
}

/// Payload of a successful `POST /api/auth`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthGrant {
    pub jwt: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_list_deserializes() {
        let body = r#"{
            "code": 0,
            "msg": "success",
            "data": [{
                "id": "abc123",
                "name": "jellyfin",
                "haveUpdate": true,
                "usingImage": "jellyfin/jellyfin:latest",
                "status": "running",
                "runningTime": "3 days",
                "createTime": "2024-05-01 10:00:00"
            }]
        }"#;

        let env: ApiEnvelope<Vec<ContainerSummary>> = serde_json::from_str(body).unwrap();
        assert_eq!(env.code, 0);
        let containers = env.data.unwrap();
        assert_eq!(containers.len(), 1);
        assert!(containers[0].have_update);
        assert_eq!(containers[0].using_image, "jellyfin/jellyfin:latest");
    }

    #[test]
    fn progress_envelope_without_data_deserializes() {
        let body = r#"{"code": 200, "msg": "拉取镜像中"}"#;
        let env: ApiEnvelope<serde_json::Value> = serde_json::from_str(body).unwrap();
        assert_eq!(env.code, 200);
        assert!(env.data.is_none());
    }

    #[test]
    fn prunable_image_detection() {
        let dangling = ImageSummary {
            id: "sha256:aaa".into(),
            used_by: vec![],
            tag: Some("old/image:1.0".into()),
        };
        let in_use = ImageSummary {
            id: "sha256:bbb".into(),
            used_by: vec!["jellyfin".into()],
            tag: Some("jellyfin/jellyfin:latest".into()),
        };
        let untagged = ImageSummary {
            id: "sha256:ccc".into(),
            used_by: vec![],
            tag: None,
        };

        assert!(dangling.is_prunable());
        assert!(!in_use.is_prunable());
        assert!(!untagged.is_prunable());
    }
}
