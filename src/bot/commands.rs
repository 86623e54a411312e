//! Slash-command surface: whitespace-delimited tokens after the name.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Summarize the last day of chat.
    Ozet,
    /// Switch personality: `/kisilik <name> [minutes]`.
    Kisilik,
    /// Weather: `/hava <city>`.
    Hava,
    /// FX rates against TRY: `/doviz [cur1] [cur2]`.
    Doviz,
    /// Crypto spot prices: `/kripto [ids…]`.
    Kripto,
    /// A joke.
    Fikra,
    /// A quote.
    Soz,
    /// Help text.
    Yardim,
}

/// Parse a message into a command plus its argument tokens.
///
/// Accepts `/cmd@botname` addressing; a suffix naming a different bot
/// means the command is not for us. Unknown commands return `None` and
/// fall through to the normal message path.
pub fn parse(text: &str, handle: Option<&str>) -> Option<(Command, Vec<String>)> {
    let mut tokens = text.split_whitespace();
    let first = tokens.next()?;
    let name = first.strip_prefix('/')?;

    let (name, target) = match name.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (name, None),
    };
    if let Some(target) = target
        && handle != Some(target)
    {
        return None;
    }

    let command = match name {
        "ozet" => Command::Ozet,
        "kisilik" => Command::Kisilik,
        "hava" => Command::Hava,
        "doviz" => Command::Doviz,
        "kripto" => Command::Kripto,
        "fikra" => Command::Fikra,
        "soz" => Command::Soz,
        "yardim" | "start" => Command::Yardim,
        _ => return None,
    };

    Some((command, tokens.map(str::to_string).collect()))
}

pub fn help_text() -> &'static str {
    "Komutlar:\n\
     /ozet — son 24 saatin özeti\n\
     /kisilik <isim> [dakika] — kişilik değiştir (normal, korsan, sinirli, terapist)\n\
     /hava <şehir> — hava durumu\n\
     /doviz [kur1] [kur2] — döviz kurları (varsayılan USD EUR)\n\
     /kripto [coin…] — kripto fiyatları (varsayılan bitcoin ethereum)\n\
     /fikra — fıkra\n\
     /soz — söz\n\
     /yardim — bu mesaj\n\n\
     Grupta @ ile etiketle ya da mesajıma cevap yaz, konuşalım."
}
