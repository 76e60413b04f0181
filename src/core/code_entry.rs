use crate::domain::model::VerificationCode;

pub const CODE_LENGTH: usize = 4;

/// 4 格驗證碼輸入框的狀態：每格一位數字，加上目前焦點所在的格子。
///
/// 所有操作對不合法的輸入都靜默忽略，回傳值表示狀態是否有改變。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeEntry {
    cells: [Option<u8>; CODE_LENGTH],
    focus: usize,
}

impl CodeEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn cell(&self, index: usize) -> Option<u8> {
        self.cells.get(index).copied().flatten()
    }

    pub fn cells(&self) -> [Option<u8>; CODE_LENGTH] {
        self.cells
    }

    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// 在第 `index` 格輸入。只接受單一位十進位數字，填入後焦點往下一格移動。
    pub fn type_input(&mut self, index: usize, input: &str) -> bool {
        if index >= CODE_LENGTH {
            return false;
        }
        let mut chars = input.chars();
        let digit = match (chars.next(), chars.next()) {
            (Some(c), None) => match c.to_digit(10) {
                Some(d) if c.is_ascii_digit() => d as u8,
                _ => return false,
            },
            _ => return false,
        };

        self.cells[index] = Some(digit);
        self.focus = if index < CODE_LENGTH - 1 { index + 1 } else { index };
        true
    }

    /// 倒退鍵：空格子時焦點回到前一格；有值時清除該格，焦點不動。
    pub fn backspace(&mut self, index: usize) -> bool {
        if index >= CODE_LENGTH {
            return false;
        }
        if self.cells[index].is_some() {
            self.cells[index] = None;
            self.focus = index;
            return true;
        }
        if index > 0 {
            self.focus = index - 1;
            return true;
        }
        false
    }

    /// 貼上：只有第一格接受，且內容 (去除前後空白) 必須剛好是 4 位數字。
    pub fn paste(&mut self, index: usize, text: &str) -> bool {
        if index != 0 {
            return false;
        }
        let text = text.trim();
        if text.len() != CODE_LENGTH || !text.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        for (cell, b) in self.cells.iter_mut().zip(text.bytes()) {
            *cell = Some(b - b'0');
        }
        self.focus = CODE_LENGTH - 1;
        true
    }

    pub fn code(&self) -> Option<VerificationCode> {
        let mut digits = [0u8; CODE_LENGTH];
        for (slot, cell) in digits.iter_mut().zip(self.cells.iter()) {
            *slot = (*cell)?;
        }
        VerificationCode::from_digits(digits)
    }

    /// 顯示用，空格以 `_` 表示
    pub fn render(&self) -> String {
        self.cells
            .iter()
            .map(|c| match c {
                Some(d) => char::from(b'0' + d),
                None => '_',
            })
            .collect()
    }
}
