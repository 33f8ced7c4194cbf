//! Built-in extraction templates seeded into an empty store

use graphscribe_domain::PromptTemplate;
use serde_json::{Map, Value};

/// Built-in Chinese extraction prompt
pub const ZH_CONTENT: &str = r#"# Knowledge Graph Extraction Prompt

## 1. Overview
你是一个顶级信息抽取模型，专门从非结构化文本中提取结构化信息，用于构建知识图谱。
- **目标**：识别文本中的实体（节点）和它们之间的关系。
- **输出格式**：JSON 格式，包含 `nodes` 和 `relationships`。

## 2. 输出结构
{
  "nodes": [
    {
      "id": "实体唯一ID，如 disease_001",
      "name": "实体名称，如 高血压",
      "type": "实体类型，如 疾病、药物、人物、组织",
      "aliases": ["别名1", "别名2"],
      "definition": "实体简要定义（从文本中提取）",
      "attributes": {
        "属性名1": ["值1", "值2"],
        "属性名2": ["值1", "值2"]
      }
    }
  ],
  "relationships": [
    {
      "source": "源实体ID",
      "target": "目标实体ID",
      "type": "关系类型，如 作用于、属于、创立者等"
    }
  ]
}

## 3. 抽取规则
- 同一实体只输出一个节点，`name` 取文本中最完整的称呼，其余称呼放入 `aliases`。
- 所有属性值必须是字符串数组，即使只有一个值。
- 关系的 `source` 和 `target` 必须是 `nodes` 中已有的 `id`。
- 只输出 JSON，不要输出解释。

## 4. Allowed Triplets (三元组限定)
- 只允许抽取下列三元组类型：
{% for triplet in allowed_triplets %}
- {{ triplet }}
{% endfor %}

## 5. 输入文本
{{ text }}

请根据上述要求提取知识图谱。"#;

/// Built-in English extraction prompt
pub const EN_CONTENT: &str = r#"# Knowledge Graph Extraction Prompt

## 1. Overview
You are a top-tier information extraction model, specialized in extracting structured information from unstructured text for building knowledge graphs.
- **Goal**: Identify entities (nodes) and their relationships in the text.
- **Output Format**: JSON containing `nodes` and `relationships`.

## 2. Output Structure
{
  "nodes": [
    {
      "id": "unique entity ID, e.g. disease_001",
      "name": "entity name, e.g. hypertension",
      "type": "entity type, e.g. disease, drug, person, organization",
      "aliases": ["alias1", "alias2"],
      "definition": "brief definition of the entity (taken from the text)",
      "attributes": {
        "attribute1": ["value1", "value2"],
        "attribute2": ["value1", "value2"]
      }
    }
  ],
  "relationships": [
    {
      "source": "source entity ID",
      "target": "target entity ID",
      "type": "relationship type, e.g. treats, belongs_to, founder_of"
    }
  ]
}

## 3. Rules
- Emit one node per entity. Use the most complete name as `name` and put the other mentions in `aliases`.
- Attribute values are always arrays of strings, even for a single value.
- Relationship `source` and `target` must be ids that appear in `nodes`.
- Output JSON only, with no explanation.

## 4. Allowed Triplets
- Only extract the following triplet types:
{% for triplet in allowed_triplets %}
- {{ triplet }}
{% endfor %}

## 5. Input Text
{{ text }}

Please extract the knowledge graph according to the above requirements."#;

fn seeded(name: &str, description: &str, language: &str, content: &str, tags: &[&str]) -> PromptTemplate {
    let mut template = PromptTemplate::new(name, language, content);
    template.description = description.to_string();
    template.tags = tags.iter().map(|t| t.to_string()).collect();
    let mut metadata = Map::new();
    metadata.insert("is_default".to_string(), Value::Bool(true));
    template.metadata = metadata;
    template.active = true;
    template
}

/// Fresh copies of the built-in templates, one per language, marked active
pub fn default_templates() -> Vec<PromptTemplate> {
    vec![
        seeded(
            "默认中文模板",
            "系统默认的中文知识图谱提取模板",
            "zh",
            ZH_CONTENT,
            &["默认", "中文"],
        ),
        seeded(
            "Default English Template",
            "Built-in English knowledge graph extraction template",
            "en",
            EN_CONTENT,
            &["default", "english"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JinjaRenderer;
    use graphscribe_domain::{PromptVariables, SchemaSpec, TemplateRenderer};

    #[test]
    fn test_defaults_cover_zh_and_en() {
        let templates = default_templates();
        let languages: Vec<&str> = templates.iter().map(|t| t.language.as_str()).collect();
        assert_eq!(languages, vec!["zh", "en"]);
        assert!(templates.iter().all(|t| t.active && t.version == 1));
        assert!(templates.iter().all(|t| t.metadata["is_default"] == Value::Bool(true)));
    }

    #[test]
    fn test_defaults_parse_and_render() {
        let renderer = JinjaRenderer::new();
        let schema = SchemaSpec::new("people", vec!["人物-毕业于->学校".to_string()]);
        let vars = PromptVariables::new("小明毕业于清华大学。", &schema);

        for template in default_templates() {
            renderer.validate(&template.content).unwrap();
            let out = renderer.render(&template.content, &vars).unwrap();
            assert!(out.contains("- 人物-毕业于->学校"));
            assert!(out.contains("小明毕业于清华大学。"));
            assert!(out.contains("\"relationships\""));
            assert!(!out.contains("{%"));
        }
    }
}
