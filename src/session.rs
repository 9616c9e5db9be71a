use crate::classifier::Classifier;
use crate::config::PatcherConfig;
use crate::emitter::{emit, PatchResult};
use crate::error::{SelectionError, SessionError};
use crate::scanner::ScannedPlugin;
use crate::selection::{group, SlotGroup};
use crate::template::{ArmorTemplate, TemplateSet};
use crate::utils::truncate_display;
use std::fmt::Write;

/// 每个分组展示的样例记录数
pub const SAMPLE_SIZE: usize = 5;

/// 交互流程状态
///
/// `Emitted` 与 `Aborted` 是终止状态，之后的输入不再改变状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    ScanDone,
    ModChosen,
    SlotChosen,
    TemplateChosen,
    Emitted,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Emitted | SessionState::Aborted)
    }
}

/// 流程终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// 操作员输入 q
    OperatorQuit,
    /// 确认时选择 n
    Declined,
    /// 没有可选插件
    NoEligiblePlugins,
    /// 选中的槽位没有模板
    NoTemplates,
}

/// 解析 1 起始的编号，返回 0 起始的下标
pub fn parse_choice(input: &str, max: usize) -> Result<usize, SelectionError> {
    let input = input.trim();
    let number: usize = input
        .parse()
        .map_err(|_| SelectionError::NotANumber(input.to_string()))?;

    if number == 0 || number > max {
        return Err(SelectionError::OutOfRange { input: number, max });
    }
    Ok(number - 1)
}

/// 交互会话：选择插件 → 选择槽位 → 选择模板 → 确认
///
/// 只处理输入文本和状态迁移，不读写终端或磁盘；生成的补丁通过 `take_result` 取出。
pub struct Session<'a> {
    plugins: &'a [ScannedPlugin],
    templates: &'a TemplateSet,
    classifier: &'a dyn Classifier,
    config: &'a PatcherConfig,
    state: SessionState,
    abort_reason: Option<AbortReason>,
    plugin_index: Option<usize>,
    groups: Vec<SlotGroup<'a>>,
    group_index: Option<usize>,
    template_index: Option<usize>,
    result: Option<PatchResult>,
}

impl<'a> Session<'a> {
    pub fn new(
        plugins: &'a [ScannedPlugin],
        templates: &'a TemplateSet,
        classifier: &'a dyn Classifier,
        config: &'a PatcherConfig,
    ) -> Self {
        let (state, abort_reason) = if plugins.is_empty() {
            (SessionState::Aborted, Some(AbortReason::NoEligiblePlugins))
        } else {
            (SessionState::ScanDone, None)
        };

        Session {
            plugins,
            templates,
            classifier,
            config,
            state,
            abort_reason,
            plugin_index: None,
            groups: Vec::new(),
            group_index: None,
            template_index: None,
            result: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn abort_reason(&self) -> Option<AbortReason> {
        self.abort_reason
    }

    pub fn chosen_plugin(&self) -> Option<&'a ScannedPlugin> {
        let plugins = self.plugins;
        self.plugin_index.and_then(move |i| plugins.get(i))
    }

    pub fn groups(&self) -> &[SlotGroup<'a>] {
        &self.groups
    }

    pub fn chosen_group(&self) -> Option<&SlotGroup<'a>> {
        self.group_index.and_then(|i| self.groups.get(i))
    }

    pub fn chosen_template(&self) -> Option<&'a ArmorTemplate> {
        let tag = self.chosen_group()?.tag;
        let templates = self.templates;
        self.template_index.and_then(move |i| templates.templates_for(tag).get(i))
    }

    /// 取出生成结果（只在 `Emitted` 状态下有值）
    pub fn take_result(&mut self) -> Option<PatchResult> {
        self.result.take()
    }

    /// 状态迁移
    ///
    /// 输入无效时返回错误且状态不变；`q` 在任何非终止状态下中止流程。
    pub fn handle(&mut self, input: &str) -> Result<SessionState, SessionError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Ok(self.abort(AbortReason::OperatorQuit));
        }

        match self.state {
            SessionState::ScanDone => {
                let index = parse_choice(input, self.plugins.len())?;
                let plugins = self.plugins;
                self.groups = group(&plugins[index].plugin, self.classifier);
                self.plugin_index = Some(index);
                self.state = SessionState::ModChosen;
            }
            SessionState::ModChosen => {
                let index = parse_choice(input, self.groups.len())?;
                self.group_index = Some(index);
                if self.templates.templates_for(self.groups[index].tag).is_empty() {
                    return Ok(self.abort(AbortReason::NoTemplates));
                }
                self.state = SessionState::SlotChosen;
            }
            SessionState::SlotChosen => {
                let tag = self.chosen_group().map(|g| g.tag);
                let count = tag.map(|t| self.templates.templates_for(t).len()).unwrap_or(0);
                self.template_index = Some(parse_choice(input, count)?);
                self.state = SessionState::TemplateChosen;
            }
            SessionState::TemplateChosen => match input.to_ascii_lowercase().as_str() {
                "y" | "yes" => self.emit()?,
                "n" | "no" => return Ok(self.abort(AbortReason::Declined)),
                _ => return Err(SelectionError::InvalidChoice(input.to_string()).into()),
            },
            SessionState::Emitted | SessionState::Aborted => {}
        }

        Ok(self.state)
    }

    fn abort(&mut self, reason: AbortReason) -> SessionState {
        tracing::debug!(?reason, from = ?self.state, "流程中止");
        self.abort_reason = Some(reason);
        self.state = SessionState::Aborted;
        self.state
    }

    fn emit(&mut self) -> Result<(), SessionError> {
        let (Some(plugin), Some(group), Some(template)) =
            (self.chosen_plugin(), self.chosen_group(), self.chosen_template())
        else {
            return Err(SelectionError::InvalidChoice("未完成选择".into()).into());
        };

        let result = emit(&plugin.plugin, group, template, self.config)?;
        self.result = Some(result);
        self.state = SessionState::Emitted;
        Ok(())
    }

    /// 当前状态的菜单文本
    pub fn prompt(&self) -> String {
        let mut out = String::new();
        // 写入 String 不会失败
        let _ = self.render_prompt(&mut out);
        out
    }

    fn render_prompt(&self, out: &mut String) -> std::fmt::Result {
        match self.state {
            SessionState::ScanDone => {
                writeln!(out, "可用的护甲插件:")?;
                for (i, scanned) in self.plugins.iter().enumerate() {
                    writeln!(
                        out,
                        "  {}. {} ({} 件护甲)",
                        i + 1,
                        scanned.display_name,
                        scanned.plugin.armor_records().len()
                    )?;
                }
                write!(out, "选择插件编号 (q 退出): ")?;
            }
            SessionState::ModChosen => {
                if let Some(scanned) = self.chosen_plugin() {
                    write!(out, "{}", scanned.plugin.get_stats())?;
                    writeln!(out, "{} 的护甲分组:", scanned.display_name)?;
                }
                for (i, group) in self.groups.iter().enumerate() {
                    writeln!(out, "  {}. {} - {} 件", i + 1, group.tag, group.len())?;
                    for armor in group.sample(SAMPLE_SIZE) {
                        writeln!(out, "       {}", truncate_display(&armor.display_name(), 50))?;
                    }
                    if group.len() > SAMPLE_SIZE {
                        writeln!(out, "       ... 另有 {} 件", group.len() - SAMPLE_SIZE)?;
                    }
                }
                write!(out, "选择槽位编号 (q 退出): ")?;
            }
            SessionState::SlotChosen => {
                if let Some(group) = self.chosen_group() {
                    writeln!(out, "{} 可用模板:", group.tag)?;
                    for (i, template) in self.templates.templates_for(group.tag).iter().enumerate() {
                        writeln!(out, "  {}. {}", i + 1, describe_template(template))?;
                    }
                }
                write!(out, "选择模板编号 (q 退出): ")?;
            }
            SessionState::TemplateChosen => {
                if let (Some(group), Some(template)) = (self.chosen_group(), self.chosen_template()) {
                    writeln!(
                        out,
                        "将把模板 \"{}\" 应用到 {} 件{}护甲，生成 {}",
                        template.name,
                        group.len(),
                        group.tag,
                        self.config.patch_identity()
                    )?;
                }
                write!(out, "确认? (y/n): ")?;
            }
            SessionState::Emitted => {
                if let Some(result) = &self.result {
                    write!(out, "{}", result.report)?;
                }
            }
            SessionState::Aborted => {
                let message = match self.abort_reason {
                    Some(AbortReason::NoEligiblePlugins) => "没有可处理的护甲插件",
                    Some(AbortReason::NoTemplates) => "该槽位没有可用模板",
                    Some(AbortReason::Declined) => "已取消，未写出任何文件",
                    Some(AbortReason::OperatorQuit) | None => "已退出，未写出任何文件",
                };
                writeln!(out, "{}", message)?;
            }
        }
        Ok(())
    }
}

fn describe_template(template: &ArmorTemplate) -> String {
    let mut parts = vec![template.name.clone()];
    if let Some(rating) = template.armor_rating {
        parts.push(format!("护甲 {}", rating));
    }
    if let Some(weight) = template.weight {
        parts.push(format!("重量 {}", weight));
    }
    if let Some(value) = template.value {
        parts.push(format!("价值 {}", value));
    }
    if let Some(armor_type) = template.armor_type {
        parts.push(armor_type.to_string());
    }
    parts.join(" | ")
}
