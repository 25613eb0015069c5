//! 纠错后端集成测试
//!
//! 用可编排的模型替换网络层，验证本地/云端后端与会话控制器的配合

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::json;

use idiomatic_zh::correction::backend::{
    Availability, CloudBackend, CorrectionBackend, HttpLocalProvider, LocalBackend,
};
use idiomatic_zh::correction::config::{BackendKind, CorrectionConfig};
use idiomatic_zh::correction::core::SessionOutcome;
use idiomatic_zh::correction::error::CorrectionError;
use idiomatic_zh::correction::types::ErrorType;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{
    controller_with, prompt_step, spawn_model_server, RecordingPresenter, ScriptedModel,
    ScriptedProvider,
};

const TIMEOUT: Duration = Duration::from_secs(5);

const DETECTED: &str = r#"```json
[{"text": "涉及", "type": "字词错误", "suggestion": "设计", "explanation": "应为设计"}]
```"#;

/// 本地后端端到端：检测 → 改写 → 评分 → 展示
#[tokio::test]
async fn test_local_backend_end_to_end() {
    let model = ScriptedModel::new(&[DETECTED, "这个桥梁的设计很独特。", "0.9"]);
    let provider = ScriptedProvider::new(Availability::Available, model.clone());
    let backend = Arc::new(LocalBackend::new(provider.clone()));
    let presenter = RecordingPresenter::new();
    let controller = controller_with(backend, presenter.clone());

    let outcome = controller.process_text("这个桥梁的涉及很独特。", None).await;

    let SessionOutcome::Presented(suggestion) = outcome else {
        panic!("应该展示建议: {:?}", outcome);
    };
    assert_eq!(suggestion.original, "这个桥梁的涉及很独特。");
    assert_eq!(suggestion.suggestion, "这个桥梁的设计很独特。");
    assert_eq!(suggestion.usefulness, 0.9);

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].ends_with("句子：这个桥梁的涉及很独特。"));
    assert!(prompts[1].contains("[字词错误] \"涉及\" → \"设计\""));
    assert!(prompts[2].contains("原句：这个桥梁的涉及很独特。\n建议：这个桥梁的设计很独特。"));

    let context = controller.context().lock().await;
    let cached = context.cache.keys();
    assert_eq!(cached, vec!["这个桥梁的涉及很独特。".to_string()]);

    println!("✅ 本地后端端到端测试通过");
}

#[tokio::test]
async fn test_local_backend_reports_detected_errors() {
    let model = ScriptedModel::new(&[DETECTED, "这个桥梁的设计很独特。", "评分：0.85"]);
    let provider = ScriptedProvider::new(Availability::Available, model);
    let backend = LocalBackend::new(provider);

    let correction = backend.correct("这个桥梁的涉及很独特。").await.unwrap();

    assert_eq!(correction.usefulness, 0.85);
    assert_eq!(correction.detected_errors.len(), 1);
    assert_eq!(correction.detected_errors[0].error_type, ErrorType::WordError);
    assert_eq!(correction.detected_errors[0].suggestion, "设计");
}

/// 会话只创建一次，之后的调用复用
#[tokio::test]
async fn test_local_session_is_created_once() {
    let model = ScriptedModel::new(&["[]", "我今天非常忙。", "0.6"]);
    model.push_replies(&["[]", ""]);
    let provider = ScriptedProvider::new(Availability::Available, model.clone());
    let backend = LocalBackend::new(provider.clone());
    assert!(!backend.has_session());

    let first = backend.correct("我今天很忙。").await.unwrap();
    let second = backend.correct("他的病已经康复了。").await.unwrap();

    assert_eq!(first.suggested_text, "我今天非常忙。");
    assert_eq!(second.suggested_text, "");
    assert_eq!(second.usefulness, 0.0);
    assert!(backend.has_session());
    assert_eq!(provider.sessions_created(), 1);
    // 第二句改写为空，跳过评分
    assert_eq!(model.prompts().len(), 5);
}

/// 模型需要下载时不可用；之后变为可用则自动恢复
#[tokio::test]
async fn test_local_backend_recovers_after_download() {
    let model = ScriptedModel::new(&["[]", "我今天非常忙。", "0.7"]);
    let provider = ScriptedProvider::new(Availability::Downloadable, model.clone());
    let backend = LocalBackend::new(provider.clone());

    let result = backend.correct("我今天很忙。").await;
    assert!(matches!(result, Err(CorrectionError::BackendUnavailable(_))));
    assert!(!backend.has_session());
    assert_eq!(provider.sessions_created(), 0);
    assert!(model.prompts().is_empty());

    provider.set_availability(Availability::Downloading);
    assert!(backend.correct("我今天很忙。").await.is_err());

    provider.set_availability(Availability::Available);
    let correction = backend.correct("我今天很忙。").await.unwrap();
    assert_eq!(correction.suggested_text, "我今天非常忙。");
    assert_eq!(provider.sessions_created(), 1);
}

#[tokio::test]
async fn test_unavailable_local_model_does_not_poison_cache() {
    let model = ScriptedModel::new(&["[]", "我今天非常忙。", "0.7"]);
    let provider = ScriptedProvider::new(Availability::Unavailable, model);
    let backend = Arc::new(LocalBackend::new(provider.clone()));
    let presenter = RecordingPresenter::new();
    let controller = controller_with(backend, presenter.clone());

    assert_eq!(
        controller.process_text("我今天很忙。", None).await,
        SessionOutcome::NoChange
    );
    assert!(controller.context().lock().await.cache.is_empty());

    provider.set_availability(Availability::Available);
    let outcome = controller.process_text("我今天很忙。", None).await;
    assert!(matches!(outcome, SessionOutcome::Presented(_)));
    assert_eq!(presenter.presented().len(), 1);
}

/// 本地会话串行执行：每次调用都在超时之内，排队总时长超过超时也不应失败
#[tokio::test]
async fn test_local_queue_wait_is_not_counted_against_timeout() {
    let base_url = spawn_model_server(|path, body| {
        if path == "/api/tags" {
            return (Duration::ZERO, json!({"models": [{"name": "qwen2.5:3b"}]}));
        }
        let prompt = body["prompt"].as_str().unwrap_or_default();
        let response = match prompt_step(prompt) {
            "detect" => "[]",
            "rewrite" => "这是一个改写后的句子。",
            _ => "0.8",
        };
        (
            Duration::from_millis(300),
            json!({"response": response, "context": [1, 2, 3]}),
        )
    })
    .await;

    let config = CorrectionConfig {
        local_url: base_url,
        local_model: "qwen2.5:3b".to_string(),
        request_timeout_secs: 1,
        ..CorrectionConfig::default()
    };
    let provider = HttpLocalProvider::from_config(&config).unwrap();
    let backend = LocalBackend::new(Arc::new(provider));

    // 3 个句子 × 3 次调用 × 300ms，排在最后的调用要等两秒多
    let sentences = ["我今天很忙啊。", "他的病已经康复了。", "这个桥梁的涉及很独特。"];
    let results = join_all(sentences.iter().map(|s| backend.correct(s))).await;

    for (sentence, result) in sentences.iter().zip(results) {
        let correction = result.unwrap_or_else(|e| panic!("{} 不应失败: {}", sentence, e));
        assert_eq!(correction.suggested_text, "这是一个改写后的句子。");
        assert_eq!(correction.usefulness, 0.8);
    }
    assert!(backend.has_session());

    println!("✅ 本地会话排队测试通过");
}

/// 单次调用超过超时仍然失败
#[tokio::test]
async fn test_local_slow_call_times_out() {
    let base_url = spawn_model_server(|path, _| {
        if path == "/api/tags" {
            return (Duration::ZERO, json!({"models": [{"name": "qwen2.5:3b"}]}));
        }
        (Duration::from_millis(1500), json!({"response": "[]"}))
    })
    .await;

    let config = CorrectionConfig {
        local_url: base_url,
        local_model: "qwen2.5:3b".to_string(),
        request_timeout_secs: 1,
        ..CorrectionConfig::default()
    };
    let backend = LocalBackend::from_config(&config).unwrap();

    let result = backend.correct("我今天很忙。").await;
    assert!(matches!(result, Err(CorrectionError::TimeoutError(_))));
}

// ============================================================================
// 云端后端
// ============================================================================

#[tokio::test]
async fn test_cloud_backend_without_key_is_unavailable() {
    let model = ScriptedModel::new(&["[]", "我今天非常忙。", "0.7"]);
    let backend = CloudBackend::with_model("  ", model.clone(), TIMEOUT);

    let result = backend.correct("我今天很忙。").await;
    assert!(matches!(result, Err(CorrectionError::BackendUnavailable(_))));
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn test_cloud_backend_runs_three_steps() {
    let model = ScriptedModel::new(&["[]", "我今天非常忙。", "0.7"]);
    let backend = Arc::new(CloudBackend::with_model("sk-test", model.clone(), TIMEOUT));
    let presenter = RecordingPresenter::new();
    let controller = controller_with(backend, presenter.clone());

    let outcome = controller.process_text("我今天很忙。", None).await;

    let SessionOutcome::Presented(suggestion) = outcome else {
        panic!("应该展示建议: {:?}", outcome);
    };
    assert_eq!(suggestion.suggestion, "我今天非常忙。");
    assert_eq!(suggestion.usefulness, 0.7);

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    // 没有检测到错误时使用"更地道"的改写提示
    assert!(prompts[1].contains("返回空字符串"));
}

#[tokio::test]
async fn test_cloud_transport_error_is_not_cached() {
    // 没有预设回答，检测步骤即失败
    let model = ScriptedModel::new(&[]);
    let backend = Arc::new(CloudBackend::with_model("sk-test", model, TIMEOUT));
    let presenter = RecordingPresenter::new();
    let controller = controller_with(backend, presenter.clone());

    let outcome = controller.process_text("我今天很忙。", None).await;

    assert_eq!(outcome, SessionOutcome::NoChange);
    assert!(presenter.presented().is_empty());
    assert_eq!(controller.stats().snapshot().units_failed, 1);
    assert!(controller.context().lock().await.cache.is_empty());
}

/// 评分步骤返回空内容时记 0 分，结果照常缓存
#[tokio::test]
async fn test_cloud_empty_rating_scores_zero() {
    let base_url = spawn_model_server(|_, body| {
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        let reply = match prompt_step(prompt) {
            "detect" => json!({"content": [{"type": "text", "text": "[]"}]}),
            "rewrite" => json!({"content": [{"type": "text", "text": "我今天非常忙。"}]}),
            _ => json!({"content": []}),
        };
        (Duration::ZERO, reply)
    })
    .await;

    let config = CorrectionConfig {
        backend: BackendKind::Cloud,
        api_key: "sk-test".to_string(),
        cloud_api_url: format!("{}/v1/messages", base_url),
        ..CorrectionConfig::default()
    };
    let backend = Arc::new(CloudBackend::from_config(&config).unwrap());

    let correction = backend.correct("我今天很忙。").await.unwrap();
    assert_eq!(correction.suggested_text, "我今天非常忙。");
    assert_eq!(correction.usefulness, 0.0);

    let presenter = RecordingPresenter::new();
    let controller = controller_with(backend, presenter.clone());
    assert_eq!(
        controller.process_text("我今天很忙。", None).await,
        SessionOutcome::NoChange
    );
    assert_eq!(controller.stats().snapshot().units_failed, 0);

    let mut context = controller.context().lock().await;
    let cached = context.cache.get("我今天很忙。").unwrap();
    assert_eq!(cached.usefulness, 0.0);
    drop(context);

    // 已缓存，不会再次请求
    assert_eq!(
        controller.process_text("我今天很忙。", None).await,
        SessionOutcome::NothingToSend
    );
}

#[tokio::test]
async fn test_cloud_empty_rewrite_is_transport_error() {
    let base_url = spawn_model_server(|_, body| {
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
        let reply = match prompt_step(prompt) {
            "detect" => json!({"content": [{"type": "text", "text": "[]"}]}),
            _ => json!({"content": []}),
        };
        (Duration::ZERO, reply)
    })
    .await;

    let config = CorrectionConfig {
        api_key: "sk-test".to_string(),
        cloud_api_url: format!("{}/v1/messages", base_url),
        ..CorrectionConfig::default()
    };
    let backend = CloudBackend::from_config(&config).unwrap();

    let result = backend.correct("我今天很忙。").await;
    assert!(matches!(result, Err(CorrectionError::TransportError(_))));
}
