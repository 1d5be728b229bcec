#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
    rest: String,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let trimmed = text.trim();
        let (prefix, rest) = match trimmed.split_once(' ') {
            Some((prefix, rest)) => (prefix, rest.trim()),
            None => (trimmed, ""),
        };

        let cmd = SlashCommand {
            command: prefix.to_string(),
            args: rest
                .split(' ')
                .filter(|e| return !e.is_empty())
                .map(|e| return e.to_string())
                .collect::<Vec<String>>(),
            rest: rest.to_string(),
        };
        if cmd.is_quit()
            || cmd.is_help()
            || cmd.is_list()
            || cmd.is_open()
            || cmd.is_new()
            || cmd.is_title()
            || cmd.is_status()
            || cmd.is_show()
            || cmd.is_save()
            || cmd.is_delete()
            || cmd.is_ask()
            || cmd.is_image()
            || cmd.is_insert()
            || cmd.is_close()
            || cmd.is_append()
        {
            return Some(cmd);
        }

        return None;
    }

    /// Everything after the command, spacing preserved.
    pub fn rest(&self) -> &str {
        return &self.rest;
    }

    pub fn first_arg(&self) -> Option<&str> {
        return self.args.first().map(|e| return e.as_str());
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }

    pub fn is_list(&self) -> bool {
        return ["/l", "/list"].contains(&self.command.as_str());
    }

    pub fn is_open(&self) -> bool {
        return ["/o", "/open"].contains(&self.command.as_str());
    }

    pub fn is_new(&self) -> bool {
        return ["/n", "/new"].contains(&self.command.as_str());
    }

    pub fn is_title(&self) -> bool {
        return ["/t", "/title"].contains(&self.command.as_str());
    }

    pub fn is_status(&self) -> bool {
        return ["/s", "/status"].contains(&self.command.as_str());
    }

    pub fn is_show(&self) -> bool {
        return ["/p", "/show"].contains(&self.command.as_str());
    }

    pub fn is_save(&self) -> bool {
        return ["/w", "/save"].contains(&self.command.as_str());
    }

    pub fn is_delete(&self) -> bool {
        return ["/d", "/delete"].contains(&self.command.as_str());
    }

    pub fn is_ask(&self) -> bool {
        return ["/a", "/ask"].contains(&self.command.as_str());
    }

    pub fn is_image(&self) -> bool {
        return ["/img", "/image"].contains(&self.command.as_str());
    }

    pub fn is_insert(&self) -> bool {
        return ["/i", "/insert"].contains(&self.command.as_str());
    }

    pub fn is_close(&self) -> bool {
        return ["/x", "/close"].contains(&self.command.as_str());
    }

    pub fn is_append(&self) -> bool {
        return ["/ap", "/append"].contains(&self.command.as_str());
    }
}
