//! 提示词模块
//!
//! 三步流程（错误检测、改写、有用性评分）所用的提示词，以及检测步骤的少样本示例。

use serde_json::json;

use crate::correction::types::{ErrorSpan, ErrorType};

/// 每个类别放进提示词的示例数量
const EXAMPLES_PER_CATEGORY: usize = 2;

/// 一条少样本示例
#[derive(Debug, Clone, Copy)]
pub struct ProofreadingExample {
    pub text: &'static str,
    /// (错误片段, 建议)
    pub errors: &'static [(&'static str, &'static str)],
    pub explanation: &'static str,
}

/// 同一类别下的示例
#[derive(Debug, Clone, Copy)]
pub struct ExampleCategory {
    pub error_type: ErrorType,
    pub examples: &'static [ProofreadingExample],
}

/// 内置示例表，每个类别同时包含有错和无错的句子
pub const PROOFREADING_EXAMPLES: &[ExampleCategory] = &[
    ExampleCategory {
        error_type: ErrorType::WordError,
        examples: &[
            ProofreadingExample {
                text: "这个桥梁的涉及很独特。",
                errors: &[("涉及", "设计")],
                explanation: "\"涉及\"指牵涉到，此处应为\"设计\"",
            },
            ProofreadingExample {
                text: "这个问题涉及到很多方面。",
                errors: &[],
                explanation: "没有错误，涉及使用正确",
            },
            ProofreadingExample {
                text: "他对这个问题的看法很独道。",
                errors: &[("独道", "独到")],
                explanation: "应该是\"独到\"，不是\"独道\"",
            },
            ProofreadingExample {
                text: "他的成就令人赞叹不己。",
                errors: &[("不己", "不已")],
                explanation: "应该是\"不已\"，不是\"不己\"",
            },
        ],
    },
    ExampleCategory {
        error_type: ErrorType::PunctuationError,
        examples: &[
            ProofreadingExample {
                text: "这是一个很好的想法,我们应该试试。",
                errors: &[(",", "，")],
                explanation: "应使用中文逗号而非英文逗号",
            },
            ProofreadingExample {
                text: "今天天气真好！我们去公园吧。",
                errors: &[],
                explanation: "标点使用正确",
            },
            ProofreadingExample {
                text: "这本书很有意思.",
                errors: &[(".", "。")],
                explanation: "应使用中文句号而非英文句号",
            },
        ],
    },
    ExampleCategory {
        error_type: ErrorType::WordOrderError,
        examples: &[
            ProofreadingExample {
                text: "我在图书馆看书昨天。",
                errors: &[("看书昨天", "昨天看书")],
                explanation: "时间词应该放在动词前",
            },
            ProofreadingExample {
                text: "昨天下午我去了公园。",
                errors: &[],
                explanation: "语序正确",
            },
            ProofreadingExample {
                text: "我昨天去了公园在下午。",
                errors: &[("去了公园在下午", "在下午去了公园")],
                explanation: "时间状语应放在动词前",
            },
        ],
    },
    ExampleCategory {
        error_type: ErrorType::GrammarError,
        examples: &[
            ProofreadingExample {
                text: "他把作业写完成了。",
                errors: &[("写完成", "写完")],
                explanation: "动词重复，应该用\"写完\"或\"完成\"",
            },
            ProofreadingExample {
                text: "因为下雨，所以我没去。",
                errors: &[],
                explanation: "语法正确",
            },
            ProofreadingExample {
                text: "他的病已经康复了。",
                errors: &[("病已经康复", "病已经好了")],
                explanation: "搭配不当，不说\"病康复\"",
            },
        ],
    },
];

/// 取某个类别的全部示例
pub fn examples_for(error_type: ErrorType) -> &'static [ProofreadingExample] {
    PROOFREADING_EXAMPLES
        .iter()
        .find(|c| c.error_type == error_type)
        .map(|c| c.examples)
        .unwrap_or(&[])
}

/// 把示例格式化为提示词片段，每个类别取前两条
pub fn format_examples_for_prompt() -> String {
    let mut prompt = String::from("## 示例（学习这些模式）：\n\n");
    let mut number = 1;

    for category in PROOFREADING_EXAMPLES {
        for example in category.examples.iter().take(EXAMPLES_PER_CATEGORY) {
            let errors: Vec<_> = example
                .errors
                .iter()
                .map(|(text, suggestion)| {
                    json!({
                        "text": text,
                        "type": category.error_type.label(),
                        "suggestion": suggestion,
                    })
                })
                .collect();

            prompt.push_str(&format!("示例{}：\n", number));
            prompt.push_str(&format!("输入：\"{}\"\n", example.text));
            prompt.push_str(&format!("输出：{}\n", serde_json::Value::Array(errors)));
            if !example.explanation.is_empty() {
                prompt.push_str(&format!("解释：{}\n", example.explanation));
            }
            prompt.push('\n');
            number += 1;
        }
    }

    prompt
}

/// 第一步：错误检测
pub fn detection_prompt(sentence: &str) -> String {
    format!(
        "你是一位严谨的中文校对老师。找出句子中的字词错误、标点误用、语序问题和语法问题。\n\
         只标记确实错误的地方，正确的表达不要标记。\n\
         用 JSON 数组回答，每一项形如 \
         {{\"text\": \"错误片段\", \"type\": \"字词错误|标点误用|语序问题|语法问题\", \
         \"suggestion\": \"修改建议\", \"explanation\": \"中文解释\", \
         \"explanationTranslated\": \"English explanation\"}}。\n\
         没有错误时返回 []。不要输出数组以外的内容。\n\n\
         {}\
         句子：{}",
        format_examples_for_prompt(),
        sentence
    )
}

/// 第二步：改写
///
/// 有错误时要求按错误修正；没有错误时只在能更地道时改写，否则返回空字符串。
pub fn rewrite_prompt(sentence: &str, errors: &[ErrorSpan]) -> String {
    if errors.is_empty() {
        return format!(
            "你是一位汉语老师，正在建议使用惯用语。\n\
             判断下面的句子是否自然、地道。如果是，返回空字符串。\n\
             否则给出一个更自然、地道的改写。如果句子包含英语，把整句译成地道的汉语。\n\
             只返回一个答案，除了改写后的句子外不要返回任何内容，不要包含解释。\n\n\
             句子：{}",
            sentence
        );
    }

    let listed: Vec<String> = errors
        .iter()
        .map(|e| {
            let mut line = format!("- [{}] \"{}\" → \"{}\"", e.error_type.label(), e.text, e.suggestion);
            if !e.explanation.is_empty() {
                line.push_str(&format!("（{}）", e.explanation));
            }
            line
        })
        .collect();

    format!(
        "你是一位汉语老师。下面的句子有以下错误：\n{}\n\n\
         根据这些错误修改句子，保持原意，使表达自然、地道。\n\
         只返回修改后的完整句子，不要包含解释。\n\n\
         句子：{}",
        listed.join("\n"),
        sentence
    )
}

/// 第三步：有用性评分
pub fn rating_prompt(original: &str, suggestion: &str) -> String {
    format!(
        "你是一位汉语老师，正在帮助学习中文的学生。评估以下建议的有用性。\n\n\
         一个有用的建议应该：\n\
         1. 保留原句的意思\n\
         2. 在措辞上提供有意义的改进\n\
         3. 与原句有明显不同\n\n\
         用0到1之间的数字评分，1 表示非常有用，0 表示没有用。\n\n\
         重要：如果建议与原句相似或完全一样，必须评分为 0（没有用）。\n\n\
         只返回一个数字（例如：0.7），不要解释。\n\n\
         原句：{}\n\
         建议：{}",
        original, suggestion
    )
}
