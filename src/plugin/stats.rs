use super::{Plugin, PluginKind};

/// 插件统计信息
#[derive(Debug, Clone)]
pub struct PluginStats {
    pub name: String,
    pub plugin_type: PluginKind,
    pub is_master: bool,
    pub is_localized: bool,
    pub master_count: usize,
    pub armor_count: usize,
}

impl std::fmt::Display for PluginStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== 插件统计信息 ===")?;
        writeln!(f, "名称: {}", self.name)?;
        writeln!(f, "类型: {}", self.plugin_type)?;
        writeln!(f, "主文件: {}", if self.is_master { "是" } else { "否" })?;
        writeln!(f, "本地化: {}", if self.is_localized { "是" } else { "否" })?;
        writeln!(f, "依赖主文件数: {}", self.master_count)?;
        writeln!(f, "护甲记录数: {}", self.armor_count)?;
        Ok(())
    }
}

impl Plugin {
    /// 获取统计信息
    pub fn get_stats(&self) -> PluginStats {
        PluginStats {
            name: self.get_name().to_string(),
            plugin_type: self.get_type(),
            is_master: self.is_master(),
            is_localized: self.is_localized(),
            master_count: self.masters.len(),
            armor_count: self.armor.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::plugin::{Plugin, PluginIdentity};

    #[test]
    fn test_stats_display() {
        let mut plugin = Plugin::new(PluginIdentity::from_file_name("ArmorModA.esp"));
        plugin.add_master(PluginIdentity::from_file_name("Skyrim.esm")).unwrap();

        let stats = plugin.get_stats();
        assert_eq!(stats.master_count, 1);
        assert_eq!(stats.armor_count, 0);

        let text = stats.to_string();
        assert!(text.contains("ArmorModA.esp"));
        assert!(text.contains("依赖主文件数: 1"));
    }
}
