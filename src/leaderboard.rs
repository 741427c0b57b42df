use leptos::*;

use crate::types::LeaderboardEntry;

/// Rows with rank >= this are rendered plainly.
pub const PODIUM_SIZE: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub top_ranked: bool,
    pub entry: LeaderboardEntry,
}

/// Rank entries in the order the server sent them. No local re-sorting.
pub fn rank_rows(entries: &[LeaderboardEntry]) -> Vec<LeaderboardRow> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| LeaderboardRow {
            rank: index + 1,
            top_ranked: index < PODIUM_SIZE,
            entry: entry.clone(),
        })
        .collect()
}

fn rank_class(top_ranked: bool) -> &'static str {
    if top_ranked {
        "text-2xl font-bold text-yellow-400"
    } else {
        "text-2xl font-bold text-gray-300"
    }
}

/// Full leaderboard list. Every update replaces all rows.
#[component]
pub fn Leaderboard(entries: ReadSignal<Vec<LeaderboardEntry>>) -> impl IntoView {
    view! {
        <>
            {move || {
                rank_rows(&entries.get())
                    .into_iter()
                    .map(|row| view! { <LeaderboardRowView row=row/> })
                    .collect_view()
            }}
        </>
    }
}

#[component]
fn LeaderboardRowView(row: LeaderboardRow) -> impl IntoView {
    let LeaderboardRow { rank, top_ranked, entry } = row;
    view! {
        <div class="flex items-center justify-between p-4 border-b border-red-800/30">
            <div class="flex items-center space-x-4">
                <span class=rank_class(top_ranked)>{rank}</span>
                <img src=entry.crest.clone() alt=entry.name.clone() class="w-10 h-10 object-contain"/>
                <div>
                    <h3 class="font-semibold">{entry.name.clone()}</h3>
                    <p class="text-sm text-gray-400">{format!("{} points", entry.points)}</p>
                </div>
            </div>
            {top_ranked.then(|| view! { <span class="text-2xl">"🏆"</span> })}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn house(name: &str, points: i64) -> LeaderboardEntry {
        LeaderboardEntry { id: None, name: name.into(), points, crest: format!("/media/{}.png", name) }
    }

    #[test]
    fn top_three_are_marked() {
        let entries = vec![
            house("Gryffindor", 100),
            house("Slytherin", 90),
            house("Hufflepuff", 80),
            house("Ravenclaw", 70),
        ];
        let rows = rank_rows(&entries);
        let marks: Vec<bool> = rows.iter().map(|r| r.top_ranked).collect();
        assert_eq!(marks, vec![true, true, true, false]);
        assert_eq!(rows[3].rank, 4);
        assert_eq!(rows[3].entry.name, "Ravenclaw");
    }

    #[test]
    fn server_order_is_kept() {
        let entries = vec![house("Ravenclaw", 10), house("Gryffindor", 500)];
        let rows = rank_rows(&entries);
        assert_eq!(rows[0].entry.name, "Ravenclaw");
        assert_eq!(rows[0].rank, 1);
    }

    #[test]
    fn empty_board_has_no_rows() {
        assert!(rank_rows(&[]).is_empty());
    }
}
