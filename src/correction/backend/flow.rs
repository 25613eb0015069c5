//! 三步纠错流程
//!
//! 1. 错误检测：少样本提示，宽松解析，解析失败按无错误处理
//! 2. 改写：根据是否检测到错误使用不同提示
//! 3. 评分：改写为空或与原句相同时跳过，记 0 分
//!
//! 传入的超时限制每一次调用。串行会话（本地模型）由会话自己在轮到它之后计时，
//! 这里传 `None`，排队时间不计入超时。

use std::future::Future;
use std::time::Duration;

use crate::correction::backend::parser::{clean_rewrite, extract_score, parse_error_spans};
use crate::correction::backend::prompts::{detection_prompt, rating_prompt, rewrite_prompt};
use crate::correction::backend::LanguageModel;
use crate::correction::error::{CorrectionError, CorrectionResult};
use crate::correction::types::Correction;

/// 在一个模型上执行完整流程
pub async fn run_correction(
    model: &dyn LanguageModel,
    sentence: &str,
    timeout: Option<Duration>,
) -> CorrectionResult<Correction> {
    let sentence = sentence.trim();
    if sentence.is_empty() {
        return Err(CorrectionError::InvalidInput("句子为空".to_string()));
    }

    let detection = with_timeout("错误检测", timeout, model.complete(&detection_prompt(sentence))).await?;
    let errors = parse_error_spans(&detection).into_spans();
    tracing::debug!("检测到 {} 处错误: {}", errors.len(), sentence);

    let rewrite = with_timeout(
        "改写",
        timeout,
        model.complete(&rewrite_prompt(sentence, &errors)),
    )
    .await?;
    let rewrite = clean_rewrite(&rewrite);

    if rewrite.is_empty() || rewrite == sentence {
        tracing::debug!("模型认为无需改写: {}", sentence);
        return Ok(Correction::new(rewrite, 0.0).with_errors(errors));
    }

    let rating = with_timeout(
        "评分",
        timeout,
        model.complete_brief(&rating_prompt(sentence, &rewrite)),
    )
    .await?;
    let usefulness = extract_score(&rating);
    tracing::debug!("改写 {} → {}，有用性 {}", sentence, rewrite, usefulness);

    Ok(Correction::new(rewrite, usefulness).with_errors(errors))
}

async fn with_timeout<F>(step: &str, timeout: Option<Duration>, call: F) -> CorrectionResult<String>
where
    F: Future<Output = CorrectionResult<String>>,
{
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| CorrectionError::TimeoutError(format!("{}步骤超过 {:?}", step, limit)))?,
        None => call.await,
    };
    result.map_err(|e| e.with_context(step))
}
